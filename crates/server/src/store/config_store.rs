use std::sync::Arc;
use std::time::Duration;

use crate::sync::DispatchPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Receives the content of a key every time the store sees it change.
pub trait ConfigListener: Send + Sync {
    /// Pool the store should run `receive_config_info` on. `None` runs it
    /// on the store's own notification path.
    fn executor(&self) -> Option<DispatchPool> {
        None
    }

    fn receive_config_info(&self, content: String);
}

/// Key-value surface of the remote configuration store.
#[async_trait::async_trait]
pub trait ConfigStore: Send + Sync {
    /// `Ok(None)` when the key has never been written.
    async fn get_config(
        &self,
        data_id: &str,
        group: &str,
        timeout: Duration,
    ) -> Result<Option<String>, StoreError>;

    async fn publish_config(
        &self,
        data_id: &str,
        group: &str,
        content: &str,
    ) -> Result<(), StoreError>;

    async fn add_listener(
        &self,
        data_id: &str,
        group: &str,
        listener: Arc<dyn ConfigListener>,
    ) -> Result<ListenerId, StoreError>;

    async fn remove_listener(
        &self,
        data_id: &str,
        group: &str,
        id: ListenerId,
    ) -> Result<(), StoreError>;
}

/// Hands `content` to `listener`, honouring its executor choice.
pub fn dispatch(listener: &Arc<dyn ConfigListener>, content: String) {
    match listener.executor() {
        Some(pool) => {
            let listener = Arc::clone(listener);
            pool.submit(move || listener.receive_config_info(content));
        }
        None => listener.receive_config_info(content),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Unreachable(String),
    Timeout,
    Rejected { status: u16, body: String },
}

impl StoreError {
    /// Worth another attempt; a rejection will not change on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Timeout)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreachable(msg) => write!(f, "config store unreachable: {msg}"),
            Self::Timeout => write!(f, "config store timed out"),
            Self::Rejected { status, body } => {
                write!(f, "config store rejected request ({status}): {body}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl ConfigListener for Recorder {
        fn receive_config_info(&self, content: String) {
            self.seen.lock().unwrap().push(content);
        }
    }

    #[test]
    fn dispatch_without_executor_runs_inline() {
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        let listener: Arc<dyn ConfigListener> = recorder.clone();
        dispatch(&listener, "payload".into());
        assert_eq!(*recorder.seen.lock().unwrap(), vec!["payload".to_string()]);
    }

    #[test]
    fn transient_classification() {
        assert!(StoreError::Timeout.is_transient());
        assert!(StoreError::Unreachable("refused".into()).is_transient());
        assert!(!StoreError::Rejected {
            status: 403,
            body: "denied".into()
        }
        .is_transient());
    }

    #[test]
    fn display_includes_status() {
        let e = StoreError::Rejected {
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(e.to_string(), "config store rejected request (500): boom");
    }
}
