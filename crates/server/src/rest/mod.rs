mod health;
mod metrics;
mod result;
mod router;
mod rules;

pub use result::{ApiError, ApiResult};
pub use router::{router, AppState};
pub use rules::RuleState;
