//! Rule entities as the dashboard stores them.
//!
//! Every category embeds a [`RuleMeta`] holding the bookkeeping fields the
//! dashboard owns (id, app, machine, timestamps). The rest of the entity is
//! category specific and mirrors the rule the enforcing services consume.

mod authority;
mod degrade;
mod flow;
mod system;

pub use authority::{AuthorityRule, AuthorityRuleEntity};
pub use degrade::{DegradeRule, DegradeRuleEntity};
pub use flow::{ClusterFlowConfig, FlowRule, FlowRuleEntity};
pub use system::{SystemRule, SystemRuleEntity};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub app: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gmt_create: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gmt_modified: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleError(pub String);

impl RuleError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl std::fmt::Display for RuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for RuleError {}

/// A rule category managed by the dashboard.
///
/// `normalize` and `merge_immutable` are the two per-category hooks the
/// generic CRUD orchestration calls; the defaults cover categories with no
/// special id handling.
pub trait RuleEntity:
    Clone + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The shape consumed by enforcing services.
    type Rule: Serialize + Send;

    /// Category name used in routes and logs.
    const KIND: &'static str;
    const DATA_ID_POSTFIX: &'static str;

    fn meta(&self) -> &RuleMeta;
    fn meta_mut(&mut self) -> &mut RuleMeta;

    fn validate(&self) -> Result<(), RuleError>;
    fn to_rule(&self) -> Self::Rule;

    fn id(&self) -> Option<i64> {
        self.meta().id
    }

    fn app(&self) -> &str {
        &self.meta().app
    }

    fn normalize(&mut self, app: &str) {
        self.meta_mut().app = app.to_string();
    }

    /// Carries the fields a client may not change over from `old`, checks
    /// the result and stamps the modification time.
    fn merge_immutable(&mut self, old: &Self, now_ms: i64) -> Result<(), RuleError> {
        let old_meta = old.meta();
        let meta = self.meta_mut();
        meta.app = old_meta.app.clone();
        meta.ip = old_meta.ip.clone();
        meta.port = old_meta.port;
        self.validate()?;

        let meta = self.meta_mut();
        meta.gmt_create = old_meta.gmt_create;
        meta.gmt_modified = Some(now_ms);
        Ok(())
    }
}

pub(crate) fn is_blank(s: Option<&str>) -> bool {
    s.map(|v| v.trim().is_empty()).unwrap_or(true)
}
