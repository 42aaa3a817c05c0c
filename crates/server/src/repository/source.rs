use std::marker::PhantomData;
use std::sync::Arc;

use flowguard_common::rule::RuleEntity;

use crate::sync::{ConfigSynchronizer, PublishOutcome, SyncError};

/// Whole-list read and replace for one rule category.
#[async_trait::async_trait]
pub trait RuleSource<T: RuleEntity>: Send + Sync {
    async fn get_rules(&self, app: &str) -> Result<Vec<T>, SyncError>;
    async fn publish(&self, app: &str, rules: &[T]) -> Result<PublishOutcome, SyncError>;
}

/// Reads and writes the category's keys through the config synchronizer.
pub struct SyncedRuleSource<T> {
    sync: Arc<ConfigSynchronizer>,
    _category: PhantomData<fn() -> T>,
}

impl<T> SyncedRuleSource<T> {
    pub fn new(sync: Arc<ConfigSynchronizer>) -> Self {
        Self {
            sync,
            _category: PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<T: RuleEntity> RuleSource<T> for SyncedRuleSource<T> {
    async fn get_rules(&self, app: &str) -> Result<Vec<T>, SyncError> {
        self.sync.fetch(app, T::DATA_ID_POSTFIX).await
    }

    async fn publish(&self, app: &str, rules: &[T]) -> Result<PublishOutcome, SyncError> {
        self.sync.publish(app, T::DATA_ID_POSTFIX, Some(rules)).await
    }
}
