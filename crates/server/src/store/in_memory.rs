use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::config_store::{dispatch, ConfigListener, ConfigStore, ListenerId, StoreError};

type Key = (String, String);

/// Process-local store. Every publish is echoed to the listeners of the
/// written key, the way a remote store notifies its subscribers.
#[derive(Clone)]
pub struct InMemoryConfigStore {
    configs: Arc<DashMap<Key, String>>,
    listeners: Arc<DashMap<Key, Vec<(ListenerId, Arc<dyn ConfigListener>)>>>,
    next_listener: Arc<AtomicU64>,
    published: Arc<AtomicUsize>,
}

impl Default for InMemoryConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self {
            configs: Arc::new(DashMap::new()),
            listeners: Arc::new(DashMap::new()),
            next_listener: Arc::new(AtomicU64::new(1)),
            published: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Seeds a key without notifying anyone.
    pub fn insert(&self, data_id: &str, group: &str, content: &str) {
        self.configs
            .insert(key(data_id, group), content.to_string());
    }

    pub fn peek(&self, data_id: &str, group: &str) -> Option<String> {
        self.configs.get(&key(data_id, group)).map(|c| c.clone())
    }

    pub fn listener_count(&self, data_id: &str, group: &str) -> usize {
        self.listeners
            .get(&key(data_id, group))
            .map(|l| l.len())
            .unwrap_or(0)
    }

    pub fn published_count(&self) -> usize {
        self.published.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn get_config(
        &self,
        data_id: &str,
        group: &str,
        _timeout: Duration,
    ) -> Result<Option<String>, StoreError> {
        Ok(self.peek(data_id, group))
    }

    async fn publish_config(
        &self,
        data_id: &str,
        group: &str,
        content: &str,
    ) -> Result<(), StoreError> {
        let k = key(data_id, group);
        self.configs.insert(k.clone(), content.to_string());
        self.published.fetch_add(1, Ordering::Relaxed);

        // Clone out of the map so no shard lock is held while listeners run.
        let targets: Vec<Arc<dyn ConfigListener>> = self
            .listeners
            .get(&k)
            .map(|l| l.iter().map(|(_, listener)| Arc::clone(listener)).collect())
            .unwrap_or_default();
        for listener in &targets {
            dispatch(listener, content.to_string());
        }
        Ok(())
    }

    async fn add_listener(
        &self,
        data_id: &str,
        group: &str,
        listener: Arc<dyn ConfigListener>,
    ) -> Result<ListenerId, StoreError> {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .entry(key(data_id, group))
            .or_default()
            .push((id, listener));
        Ok(id)
    }

    async fn remove_listener(
        &self,
        data_id: &str,
        group: &str,
        id: ListenerId,
    ) -> Result<(), StoreError> {
        let k = key(data_id, group);
        let now_empty = match self.listeners.get_mut(&k) {
            Some(mut entry) => {
                entry.retain(|(lid, _)| *lid != id);
                entry.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.listeners.remove_if(&k, |_, l| l.is_empty());
        }
        Ok(())
    }
}

fn key(data_id: &str, group: &str) -> Key {
    (data_id.to_string(), group.to_string())
}
