mod dispatch;
mod error;
mod synchronizer;

pub use dispatch::DispatchPool;
pub use error::SyncError;
pub use synchronizer::{
    ConfigSynchronizer, PublishOutcome, SyncConfig, DEFAULT_CONFIRM_TIMEOUT, DEFAULT_READ_TIMEOUT,
};
