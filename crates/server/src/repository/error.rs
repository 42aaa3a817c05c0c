use flowguard_common::rule::RuleError;

use crate::sync::SyncError;

#[derive(Debug)]
pub enum RepositoryError {
    InvalidArgument(String),
    Sync(SyncError),
}

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(msg) => f.write_str(msg),
            Self::Sync(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RepositoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidArgument(_) => None,
            Self::Sync(e) => Some(e),
        }
    }
}

impl From<RuleError> for RepositoryError {
    fn from(e: RuleError) -> Self {
        Self::InvalidArgument(e.0)
    }
}

impl From<SyncError> for RepositoryError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::InvalidArgument(msg) => Self::InvalidArgument(msg),
            other => Self::Sync(other),
        }
    }
}
