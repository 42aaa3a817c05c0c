use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

use flowguard_common::data_id::{dashboard_data_id, data_id};
use flowguard_common::rule::RuleEntity;

use super::dispatch::DispatchPool;
use super::error::SyncError;
use crate::metrics::sync_metrics::SyncMetrics;
use crate::store::{ConfigListener, ConfigStore};

pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_millis(2000);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub confirm_timeout: Duration,
    pub read_timeout: Duration,
    /// Full entity list under `<app><postfix>-dashboard`.
    pub dashboard_sink: bool,
    /// Production rule list under `<app><postfix>`, read by enforcing services.
    pub consumer_sink: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            dashboard_sink: true,
            consumer_sink: false,
        }
    }
}

/// Result of a publish. `Unconfirmed` is not a failure: the write itself
/// succeeded, only the change echo did not arrive in time. `Written` means
/// only the consumer key was written, so no echo was awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Skipped,
    Written,
    Confirmed,
    Unconfirmed,
}

/// Writes rule lists to the config store and reads them back.
///
/// A publish registers a one-shot listener on the dashboard key, writes,
/// then waits up to `confirm_timeout` for the store to report a change on
/// that key. The echo is a liveness hint only: nothing checks that the
/// echoed content is the payload just written.
pub struct ConfigSynchronizer {
    store: Arc<dyn ConfigStore>,
    group_id: String,
    config: SyncConfig,
    pool: DispatchPool,
    metrics: Arc<SyncMetrics>,
}

struct ConfirmListener {
    gate: Mutex<Option<oneshot::Sender<()>>>,
    pool: DispatchPool,
}

impl ConfigListener for ConfirmListener {
    fn executor(&self) -> Option<DispatchPool> {
        Some(self.pool.clone())
    }

    fn receive_config_info(&self, _content: String) {
        let gate = self
            .gate
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(tx) = gate {
            let _ = tx.send(());
        }
    }
}

impl ConfigSynchronizer {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        group_id: impl Into<String>,
        config: SyncConfig,
        pool: DispatchPool,
        metrics: Arc<SyncMetrics>,
    ) -> Self {
        Self {
            store,
            group_id: group_id.into(),
            config,
            pool,
            metrics,
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub async fn publish<T: RuleEntity>(
        &self,
        app: &str,
        postfix: &str,
        rules: Option<&[T]>,
    ) -> Result<PublishOutcome, SyncError> {
        if app.trim().is_empty() {
            return Err(SyncError::InvalidArgument(
                "app name cannot be empty".into(),
            ));
        }
        let Some(rules) = rules else {
            self.metrics.inc_publishes_skipped();
            return Ok(PublishOutcome::Skipped);
        };

        let start = Instant::now();
        self.metrics.inc_publishes();

        // Serialize up front so a codec failure never leaves a listener behind.
        let consumer_payload = if self.config.consumer_sink {
            let production: Vec<T::Rule> = rules.iter().map(T::to_rule).collect();
            Some(serde_json::to_string_pretty(&production)?)
        } else {
            None
        };
        let dashboard_payload = if self.config.dashboard_sink {
            Some(serde_json::to_string_pretty(rules)?)
        } else {
            None
        };

        if let Some(payload) = &consumer_payload {
            self.write(&data_id(app, postfix), payload).await?;
        }

        let outcome = match &dashboard_payload {
            Some(payload) => {
                self.write_and_confirm(&dashboard_data_id(app, postfix), payload)
                    .await?
            }
            None => PublishOutcome::Written,
        };

        match outcome {
            PublishOutcome::Confirmed => self.metrics.inc_publishes_confirmed(),
            PublishOutcome::Unconfirmed => {
                self.metrics.inc_publishes_unconfirmed();
                tracing::warn!(
                    app,
                    postfix,
                    timeout_ms = self.config.confirm_timeout.as_millis() as u64,
                    "publish not confirmed by config store"
                );
            }
            PublishOutcome::Written | PublishOutcome::Skipped => {}
        }
        self.metrics.record_publish_latency(start);
        tracing::info!(app, postfix, rules = rules.len(), ?outcome, "rules published");
        Ok(outcome)
    }

    /// Reads the dashboard key. A missing or blank payload is an empty list.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        app: &str,
        postfix: &str,
    ) -> Result<Vec<T>, SyncError> {
        self.metrics.inc_fetches();
        let key = dashboard_data_id(app, postfix);
        let content = self
            .store
            .get_config(&key, &self.group_id, self.config.read_timeout)
            .await
            .inspect_err(|e| {
                self.metrics.inc_store_errors();
                tracing::error!(data_id = %key, error = %e, "failed to read rules");
            })?;

        match content {
            Some(text) if !text.trim().is_empty() => Ok(serde_json::from_str(&text)?),
            _ => Ok(Vec::new()),
        }
    }

    async fn write(&self, key: &str, payload: &str) -> Result<(), SyncError> {
        self.store
            .publish_config(key, &self.group_id, payload)
            .await
            .inspect_err(|e| {
                self.metrics.inc_store_errors();
                tracing::error!(data_id = %key, error = %e, "failed to write rules");
            })?;
        Ok(())
    }

    /// Listen, write, wait, unlisten. The listener is removed on every path
    /// once it has been registered.
    async fn write_and_confirm(
        &self,
        key: &str,
        payload: &str,
    ) -> Result<PublishOutcome, SyncError> {
        let (tx, rx) = oneshot::channel();
        let listener = Arc::new(ConfirmListener {
            gate: Mutex::new(Some(tx)),
            pool: self.pool.clone(),
        });

        let listener_id = self
            .store
            .add_listener(key, &self.group_id, listener)
            .await
            .inspect_err(|_| self.metrics.inc_store_errors())?;

        let result = match self.write(key, payload).await {
            Ok(()) => match tokio::time::timeout(self.config.confirm_timeout, rx).await {
                Ok(Ok(())) => Ok(PublishOutcome::Confirmed),
                _ => Ok(PublishOutcome::Unconfirmed),
            },
            Err(e) => Err(e),
        };

        if let Err(e) = self
            .store
            .remove_listener(key, &self.group_id, listener_id)
            .await
        {
            self.metrics.inc_store_errors();
            tracing::warn!(data_id = %key, error = %e, "failed to remove confirm listener");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{dispatch, InMemoryConfigStore, ListenerId, StoreError};
    use flowguard_common::rule::{FlowRuleEntity, RuleMeta};

    const GROUP: &str = "SENTINEL_GROUP";
    const POSTFIX: &str = "-flow-rules";

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Listen(String),
        Write(String),
        Unlisten(String),
    }

    /// Records every call. Echoes writes only when `echo` is set; fails
    /// writes when `fail_writes` is set.
    #[derive(Default)]
    struct ScriptedStore {
        events: Mutex<Vec<Event>>,
        listeners: Mutex<Vec<(ListenerId, String, Arc<dyn ConfigListener>)>>,
        echo: bool,
        fail_writes: bool,
    }

    impl ScriptedStore {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
            self.events().into_iter().filter(|e| pred(e)).count()
        }
    }

    #[async_trait::async_trait]
    impl ConfigStore for ScriptedStore {
        async fn get_config(
            &self,
            _data_id: &str,
            _group: &str,
            _timeout: Duration,
        ) -> Result<Option<String>, StoreError> {
            Err(StoreError::Timeout)
        }

        async fn publish_config(
            &self,
            data_id: &str,
            _group: &str,
            content: &str,
        ) -> Result<(), StoreError> {
            self.events
                .lock()
                .unwrap()
                .push(Event::Write(data_id.to_string()));
            if self.fail_writes {
                return Err(StoreError::Unreachable("connection refused".into()));
            }
            if self.echo {
                let targets: Vec<_> = self
                    .listeners
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|(_, k, _)| k == data_id)
                    .map(|(_, _, l)| Arc::clone(l))
                    .collect();
                for l in &targets {
                    dispatch(l, content.to_string());
                }
            }
            Ok(())
        }

        async fn add_listener(
            &self,
            data_id: &str,
            _group: &str,
            listener: Arc<dyn ConfigListener>,
        ) -> Result<ListenerId, StoreError> {
            let mut listeners = self.listeners.lock().unwrap();
            let id = ListenerId(listeners.len() as u64 + 1);
            listeners.push((id, data_id.to_string(), listener));
            self.events
                .lock()
                .unwrap()
                .push(Event::Listen(data_id.to_string()));
            Ok(id)
        }

        async fn remove_listener(
            &self,
            data_id: &str,
            _group: &str,
            id: ListenerId,
        ) -> Result<(), StoreError> {
            self.listeners.lock().unwrap().retain(|(lid, _, _)| *lid != id);
            self.events
                .lock()
                .unwrap()
                .push(Event::Unlisten(data_id.to_string()));
            Ok(())
        }
    }

    fn rule(id: i64) -> FlowRuleEntity {
        FlowRuleEntity {
            meta: RuleMeta {
                id: Some(id),
                app: "orderSvc".into(),
                ..Default::default()
            },
            resource: Some("/api".into()),
            limit_app: Some("default".into()),
            grade: Some(1),
            count: Some(10.0),
            strategy: Some(0),
            control_behavior: Some(0),
            ..Default::default()
        }
    }

    fn synchronizer(
        store: Arc<dyn ConfigStore>,
        config: SyncConfig,
    ) -> (ConfigSynchronizer, Arc<SyncMetrics>) {
        let metrics = SyncMetrics::new();
        let pool = DispatchPool::spawn("test-config-listener", metrics.clone()).unwrap();
        let sync = ConfigSynchronizer::new(store, GROUP, config, pool, metrics.clone());
        (sync, metrics)
    }

    #[tokio::test]
    async fn confirmed_publish_listens_writes_then_unlistens() {
        let store = Arc::new(ScriptedStore {
            echo: true,
            ..Default::default()
        });
        let (sync, metrics) = synchronizer(store.clone(), SyncConfig::default());

        let outcome = sync
            .publish("orderSvc", POSTFIX, Some(&[rule(1)][..]))
            .await
            .unwrap();

        assert_eq!(outcome, PublishOutcome::Confirmed);
        let key = "orderSvc-flow-rules-dashboard".to_string();
        assert_eq!(
            store.events(),
            vec![
                Event::Listen(key.clone()),
                Event::Write(key.clone()),
                Event::Unlisten(key)
            ]
        );
        assert_eq!(metrics.publishes_confirmed_total(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_echo_times_out_without_error_and_still_unlistens() {
        let store = Arc::new(ScriptedStore::default());
        let (sync, metrics) = synchronizer(store.clone(), SyncConfig::default());

        let outcome = sync
            .publish("orderSvc", POSTFIX, Some(&[rule(1)][..]))
            .await
            .unwrap();

        assert_eq!(outcome, PublishOutcome::Unconfirmed);
        assert_eq!(store.count(|e| matches!(e, Event::Unlisten(_))), 1);
        assert!(store.listeners.lock().unwrap().is_empty());
        assert_eq!(metrics.publishes_unconfirmed_total(), 1);
    }

    #[tokio::test]
    async fn failed_write_propagates_and_unlistens() {
        let store = Arc::new(ScriptedStore {
            fail_writes: true,
            ..Default::default()
        });
        let (sync, metrics) = synchronizer(store.clone(), SyncConfig::default());

        let err = sync
            .publish("orderSvc", POSTFIX, Some(&[rule(1)][..]))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Store(StoreError::Unreachable(_))));
        assert_eq!(store.count(|e| matches!(e, Event::Unlisten(_))), 1);
        assert_eq!(metrics.store_errors_total(), 1);
    }

    #[tokio::test]
    async fn empty_app_rejected_without_touching_store() {
        let store = Arc::new(ScriptedStore::default());
        let (sync, _) = synchronizer(store.clone(), SyncConfig::default());

        let err = sync
            .publish::<FlowRuleEntity>("", POSTFIX, Some(&[][..]))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::InvalidArgument(_)));
        assert!(store.events().is_empty());
    }

    #[tokio::test]
    async fn absent_rules_are_a_no_op() {
        let store = Arc::new(ScriptedStore::default());
        let (sync, metrics) = synchronizer(store.clone(), SyncConfig::default());

        let outcome = sync
            .publish::<FlowRuleEntity>("orderSvc", POSTFIX, None)
            .await
            .unwrap();

        assert_eq!(outcome, PublishOutcome::Skipped);
        assert!(store.events().is_empty());
        assert_eq!(metrics.publishes_skipped_total(), 1);
    }

    #[tokio::test]
    async fn consumer_sink_writes_production_rules_first() {
        let store = Arc::new(ScriptedStore {
            echo: true,
            ..Default::default()
        });
        let config = SyncConfig {
            consumer_sink: true,
            ..Default::default()
        };
        let (sync, _) = synchronizer(store.clone(), config);

        sync.publish("orderSvc", POSTFIX, Some(&[rule(1)][..]))
            .await
            .unwrap();

        let writes: Vec<_> = store
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Write(k) => Some(k),
                _ => None,
            })
            .collect();
        assert_eq!(
            writes,
            vec![
                "orderSvc-flow-rules".to_string(),
                "orderSvc-flow-rules-dashboard".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn dashboard_sink_disabled_skips_confirmation() {
        let store = Arc::new(ScriptedStore::default());
        let config = SyncConfig {
            dashboard_sink: false,
            consumer_sink: true,
            ..Default::default()
        };
        let (sync, metrics) = synchronizer(store.clone(), config);

        let outcome = sync
            .publish("orderSvc", POSTFIX, Some(&[rule(1)][..]))
            .await
            .unwrap();

        assert_eq!(outcome, PublishOutcome::Written);
        assert_eq!(
            store.events(),
            vec![Event::Write("orderSvc-flow-rules".into())]
        );
        assert_eq!(metrics.publishes_unconfirmed_total(), 0);
        assert_eq!(metrics.publishes_confirmed_total(), 0);
        assert_eq!(metrics.publishes_total(), 1);
    }

    #[tokio::test]
    async fn round_trip_through_in_memory_store() {
        let store = Arc::new(InMemoryConfigStore::new());
        let (sync, _) = synchronizer(store.clone(), SyncConfig::default());

        let outcome = sync
            .publish("orderSvc", POSTFIX, Some(&[rule(1), rule(2)][..]))
            .await
            .unwrap();
        assert_eq!(outcome, PublishOutcome::Confirmed);
        assert_eq!(store.listener_count("orderSvc-flow-rules-dashboard", GROUP), 0);

        let stored = store.peek("orderSvc-flow-rules-dashboard", GROUP).unwrap();
        assert!(stored.contains('\n'), "payload should be pretty-printed");

        let back: Vec<FlowRuleEntity> = sync.fetch("orderSvc", POSTFIX).await.unwrap();
        assert_eq!(back, vec![rule(1), rule(2)]);
    }

    #[tokio::test]
    async fn fetch_missing_key_is_empty() {
        let store = Arc::new(InMemoryConfigStore::new());
        let (sync, _) = synchronizer(store, SyncConfig::default());
        let rules: Vec<FlowRuleEntity> = sync.fetch("nobody", POSTFIX).await.unwrap();
        assert!(rules.is_empty());
    }

    #[tokio::test]
    async fn fetch_blank_payload_is_empty() {
        let store = Arc::new(InMemoryConfigStore::new());
        store.insert("orderSvc-flow-rules-dashboard", GROUP, "  \n");
        let (sync, _) = synchronizer(store, SyncConfig::default());
        let rules: Vec<FlowRuleEntity> = sync.fetch("orderSvc", POSTFIX).await.unwrap();
        assert!(rules.is_empty());
    }

    #[tokio::test]
    async fn fetch_garbage_is_codec_error() {
        let store = Arc::new(InMemoryConfigStore::new());
        store.insert("orderSvc-flow-rules-dashboard", GROUP, "{not json");
        let (sync, _) = synchronizer(store, SyncConfig::default());
        let err = sync.fetch::<FlowRuleEntity>("orderSvc", POSTFIX).await.unwrap_err();
        assert!(matches!(err, SyncError::Codec(_)));
    }

    #[tokio::test]
    async fn fetch_store_failure_is_reported() {
        let store = Arc::new(ScriptedStore::default());
        let (sync, metrics) = synchronizer(store, SyncConfig::default());
        let err = sync.fetch::<FlowRuleEntity>("orderSvc", POSTFIX).await.unwrap_err();
        assert!(matches!(err, SyncError::Store(StoreError::Timeout)));
        assert_eq!(metrics.store_errors_total(), 1);
    }
}
