mod error;
mod rule_repository;
mod source;

pub use error::RepositoryError;
pub use rule_repository::{RuleRepository, UpdateOutcome};
pub use source::{RuleSource, SyncedRuleSource};
