use dashmap::DashMap;
use reqwest::{Client, StatusCode};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use flowguard_common::retry::{retry_async_if, RetryConfig};

use super::config_store::{dispatch, ConfigListener, ConfigStore, ListenerId, StoreError};

const CONFIGS_PATH: &str = "/v1/cs/configs";
const WATCH_READ_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct NacosSettings {
    /// Base URL including the context path, e.g. `http://127.0.0.1:8848/nacos`.
    pub server_addr: String,
    pub namespace: Option<String>,
    pub poll_interval: Duration,
    /// Bound on a single publish request.
    pub write_timeout: Duration,
    pub retry: RetryConfig,
}

/// Nacos config service over its HTTP open API.
///
/// Only the calls the synchronizer needs are implemented. Listeners are
/// served by a watcher task per registration that polls the key and fires
/// when the content digest changes.
#[derive(Clone)]
pub struct NacosConfigStore {
    inner: Arc<Inner>,
    watchers: Arc<DashMap<ListenerId, JoinHandle<()>>>,
    next_listener: Arc<AtomicU64>,
}

struct Inner {
    client: Client,
    configs_url: String,
    namespace: Option<String>,
    poll_interval: Duration,
    write_timeout: Duration,
    retry: RetryConfig,
}

impl NacosConfigStore {
    pub fn new(settings: NacosSettings) -> Result<Self, StoreError> {
        let client = Client::builder()
            .build()
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;
        let base = settings.server_addr.trim_end_matches('/');

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                configs_url: format!("{base}{CONFIGS_PATH}"),
                namespace: settings.namespace.filter(|ns| !ns.is_empty()),
                poll_interval: settings.poll_interval,
                write_timeout: settings.write_timeout,
                retry: settings.retry,
            }),
            watchers: Arc::new(DashMap::new()),
            next_listener: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }
}

impl Inner {
    fn params<'a>(&'a self, data_id: &'a str, group: &'a str) -> Vec<(&'static str, &'a str)> {
        let mut params = vec![("dataId", data_id), ("group", group)];
        if let Some(ns) = &self.namespace {
            params.push(("tenant", ns.as_str()));
        }
        params
    }

    async fn get_once(
        &self,
        data_id: &str,
        group: &str,
        timeout: Duration,
    ) -> Result<Option<String>, StoreError> {
        let resp = self
            .client
            .get(&self.configs_url)
            .query(&self.params(data_id, group))
            .timeout(timeout)
            .send()
            .await
            .map_err(transport_error)?;

        match resp.status() {
            StatusCode::OK => Ok(Some(resp.text().await.map_err(transport_error)?)),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(rejected(status, resp).await),
        }
    }

    async fn get(
        &self,
        data_id: &str,
        group: &str,
        timeout: Duration,
    ) -> Result<Option<String>, StoreError> {
        retry_async_if(&self.retry, StoreError::is_transient, || {
            self.get_once(data_id, group, timeout)
        })
        .await
    }

    async fn publish(&self, data_id: &str, group: &str, content: &str) -> Result<(), StoreError> {
        let mut form = self.params(data_id, group);
        form.push(("content", content));
        form.push(("type", "json"));

        let resp = self
            .client
            .post(&self.configs_url)
            .form(&form)
            .timeout(self.write_timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(rejected(status, resp).await);
        }
        let body = resp.text().await.map_err(transport_error)?;
        if body.trim() != "true" {
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

fn transport_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::Unreachable(e.to_string())
    }
}

async fn rejected(status: StatusCode, resp: reqwest::Response) -> StoreError {
    StoreError::Rejected {
        status: status.as_u16(),
        body: resp.text().await.unwrap_or_default(),
    }
}

fn digest(content: Option<&str>) -> Option<Vec<u8>> {
    content.map(|c| Sha256::digest(c.as_bytes()).to_vec())
}

async fn watch(
    inner: Arc<Inner>,
    data_id: String,
    group: String,
    listener: Arc<dyn ConfigListener>,
    mut last: Option<Vec<u8>>,
) {
    let mut ticker = tokio::time::interval(inner.poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let content = match inner.get_once(&data_id, &group, WATCH_READ_TIMEOUT).await {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(data_id = %data_id, error = %e, "watch poll failed");
                continue;
            }
        };
        let current = digest(content.as_deref());
        if current != last {
            last = current;
            tracing::debug!(data_id = %data_id, "config change observed");
            dispatch(&listener, content.unwrap_or_default());
        }
    }
}

#[async_trait::async_trait]
impl ConfigStore for NacosConfigStore {
    async fn get_config(
        &self,
        data_id: &str,
        group: &str,
        timeout: Duration,
    ) -> Result<Option<String>, StoreError> {
        self.inner.get(data_id, group, timeout).await
    }

    async fn publish_config(
        &self,
        data_id: &str,
        group: &str,
        content: &str,
    ) -> Result<(), StoreError> {
        self.inner.publish(data_id, group, content).await
    }

    /// The baseline digest is taken before returning, so a content change
    /// written right after registration is never folded into the baseline.
    async fn add_listener(
        &self,
        data_id: &str,
        group: &str,
        listener: Arc<dyn ConfigListener>,
    ) -> Result<ListenerId, StoreError> {
        let baseline = self.inner.get(data_id, group, WATCH_READ_TIMEOUT).await?;
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));

        let handle = tokio::spawn(watch(
            Arc::clone(&self.inner),
            data_id.to_string(),
            group.to_string(),
            listener,
            digest(baseline.as_deref()),
        ));
        self.watchers.insert(id, handle);
        Ok(id)
    }

    async fn remove_listener(
        &self,
        _data_id: &str,
        _group: &str,
        id: ListenerId,
    ) -> Result<(), StoreError> {
        if let Some((_, handle)) = self.watchers.remove(&id) {
            handle.abort();
        }
        Ok(())
    }
}
