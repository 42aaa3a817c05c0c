use serde::{Deserialize, Serialize};

use super::{RuleEntity, RuleError, RuleMeta};
use crate::data_id::SYSTEM_DATA_ID_POSTFIX;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemRuleEntity {
    #[serde(flatten)]
    pub meta: RuleMeta,
    pub highest_system_load: Option<f64>,
    pub avg_rt: Option<i64>,
    pub max_thread: Option<i64>,
    pub qps: Option<f64>,
    pub highest_cpu_usage: Option<f64>,
}

/// Unset thresholds are encoded as `-1`, meaning "not checked".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemRule {
    pub highest_system_load: f64,
    pub avg_rt: i64,
    pub max_thread: i64,
    pub qps: f64,
    pub highest_cpu_usage: f64,
}

impl RuleEntity for SystemRuleEntity {
    type Rule = SystemRule;

    const KIND: &'static str = "system";
    const DATA_ID_POSTFIX: &'static str = SYSTEM_DATA_ID_POSTFIX;

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
        let thresholds = [
            self.highest_system_load,
            self.avg_rt.map(|v| v as f64),
            self.max_thread.map(|v| v as f64),
            self.qps,
            self.highest_cpu_usage,
        ];
        if thresholds.iter().all(Option::is_none) {
            return Err(RuleError::new("at least one threshold must be set"));
        }
        if thresholds.iter().flatten().any(|v| *v < 0.0) {
            return Err(RuleError::new("thresholds can't be negative"));
        }
        if self.highest_cpu_usage.is_some_and(|v| v > 1.0) {
            return Err(RuleError::new("highestCpuUsage must between [0.0, 1.0]"));
        }
        Ok(())
    }

    fn to_rule(&self) -> SystemRule {
        SystemRule {
            highest_system_load: self.highest_system_load.unwrap_or(-1.0),
            avg_rt: self.avg_rt.unwrap_or(-1),
            max_thread: self.max_thread.unwrap_or(-1),
            qps: self.qps.unwrap_or(-1.0),
            highest_cpu_usage: self.highest_cpu_usage.unwrap_or(-1.0),
        }
    }
}
