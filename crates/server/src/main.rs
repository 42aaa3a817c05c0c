use std::error::Error;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use flowguard_server::config::{self, LogFormat, ServerConfig, StoreKind};
use flowguard_server::metrics::sync_metrics::SyncMetrics;
use flowguard_server::rest::{self, AppState};
use flowguard_server::shutdown::wait_for_shutdown;
use flowguard_server::store::{ConfigStore, InMemoryConfigStore, NacosConfigStore};
use flowguard_server::sync::{ConfigSynchronizer, DispatchPool};

type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = config::load_from_env()?;
    init_tracing(config.log_format);
    let metrics = SyncMetrics::new();

    let store = build_store(&config)?;
    let pool = DispatchPool::spawn("flowguard-config-listener", Arc::clone(&metrics))?;
    let sync = Arc::new(ConfigSynchronizer::new(
        store,
        config.store.group_id.clone(),
        config.sync.sync_config(),
        pool,
        Arc::clone(&metrics),
    ));

    let app = rest::router(AppState::new(sync, metrics));
    let rest_addr = config.rest_addr;
    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    tracing::info!(%rest_addr, group = %config.store.group_id, "REST server starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    tracing::info!("REST server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn build_store(config: &ServerConfig) -> Result<Arc<dyn ConfigStore>, BoxError> {
    match config.store.kind {
        StoreKind::Memory => {
            tracing::warn!("using in-memory config store, rules are lost on restart");
            Ok(Arc::new(InMemoryConfigStore::new()))
        }
        StoreKind::Nacos => {
            let settings = config.store.nacos_settings();
            tracing::info!(
                server_addr = %settings.server_addr,
                namespace = settings.namespace.as_deref().unwrap_or(""),
                "using nacos config store"
            );
            Ok(Arc::new(NacosConfigStore::new(settings)?))
        }
    }
}
