use serde::{Deserialize, Serialize};

use super::{is_blank, RuleEntity, RuleError, RuleMeta};
use crate::data_id::AUTHORITY_DATA_ID_POSTFIX;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityRuleEntity {
    #[serde(flatten)]
    pub meta: RuleMeta,
    pub limit_app: Option<String>,
    pub resource: Option<String>,
    /// 0 = white list, 1 = black list.
    pub strategy: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityRule {
    pub resource: String,
    pub limit_app: String,
    pub strategy: i32,
}

impl RuleEntity for AuthorityRuleEntity {
    type Rule = AuthorityRule;

    const KIND: &'static str = "authority";
    const DATA_ID_POSTFIX: &'static str = AUTHORITY_DATA_ID_POSTFIX;

    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RuleMeta {
        &mut self.meta
    }

    fn validate(&self) -> Result<(), RuleError> {
        if self.meta.app.trim().is_empty() {
            return Err(RuleError::new("app can't be null or empty"));
        }
        if is_blank(self.limit_app.as_deref()) {
            return Err(RuleError::new("limitApp should be valid"));
        }
        if is_blank(self.resource.as_deref()) {
            return Err(RuleError::new("resource name cannot be null or empty"));
        }
        match self.strategy {
            Some(0) | Some(1) => Ok(()),
            _ => Err(RuleError::new("Unknown strategy (must be blacklist or whitelist)")),
        }
    }

    fn to_rule(&self) -> AuthorityRule {
        AuthorityRule {
            resource: self.resource.clone().unwrap_or_default(),
            limit_app: self.limit_app.clone().unwrap_or_default(),
            strategy: self.strategy.unwrap_or(0),
        }
    }
}
