use serde::{Deserialize, Serialize};

use super::{is_blank, RuleEntity, RuleError, RuleMeta};
use crate::data_id::DEGRADE_DATA_ID_POSTFIX;

const GRADE_SLOW_RATIO: i32 = 0;
const GRADE_EXCEPTION_RATIO: i32 = 1;
const GRADE_EXCEPTION_COUNT: i32 = 2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DegradeRuleEntity {
    #[serde(flatten)]
    pub meta: RuleMeta,
    pub limit_app: Option<String>,
    pub resource: Option<String>,
    pub grade: Option<i32>,
    pub count: Option<f64>,
    pub time_window: Option<i32>,
    pub min_request_amount: Option<i32>,
    pub slow_ratio_threshold: Option<f64>,
    pub stat_interval_ms: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DegradeRule {
    pub resource: String,
    pub limit_app: String,
    pub grade: i32,
    pub count: f64,
    pub time_window: i32,
    pub min_request_amount: i32,
    pub slow_ratio_threshold: f64,
    pub stat_interval_ms: i32,
}

impl RuleEntity for DegradeRuleEntity {
    type Rule = DegradeRule;

    const KIND: &'static str = "degrade";
    const DATA_ID_POSTFIX: &'static str = DEGRADE_DATA_ID_POSTFIX;

    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RuleMeta {
        &mut self.meta
    }

    fn validate(&self) -> Result<(), RuleError> {
        if self.meta.app.trim().is_empty() {
            return Err(RuleError::new("app can't be blank"));
        }
        if is_blank(self.limit_app.as_deref()) {
            return Err(RuleError::new("limitApp can't be null or empty"));
        }
        if is_blank(self.resource.as_deref()) {
            return Err(RuleError::new("resource can't be null or empty"));
        }
        let grade = self
            .grade
            .ok_or_else(|| RuleError::new("circuit breaker strategy cannot be null"))?;
        if !(GRADE_SLOW_RATIO..=GRADE_EXCEPTION_COUNT).contains(&grade) {
            return Err(RuleError::new(format!(
                "Invalid circuit breaker strategy: {grade}"
            )));
        }
        match self.count {
            Some(c) if c >= 0.0 => {}
            _ => return Err(RuleError::new("invalid threshold")),
        }
        match self.time_window {
            Some(w) if w > 0 => {}
            _ => return Err(RuleError::new("recoveryTimeout should be positive")),
        }
        if grade == GRADE_SLOW_RATIO {
            match self.slow_ratio_threshold {
                Some(r) if (0.0..=1.0).contains(&r) => {}
                _ => {
                    return Err(RuleError::new(
                        "SlowRatioThreshold should be in range: [0.0, 1.0]",
                    ))
                }
            }
        }
        if grade == GRADE_EXCEPTION_RATIO && self.count.unwrap_or(0.0) > 1.0 {
            return Err(RuleError::new(
                "Ratio threshold should be in range: [0.0, 1.0]",
            ));
        }
        if let Some(interval) = self.stat_interval_ms {
            if interval <= 0 {
                return Err(RuleError::new("statIntervalMs should be positive"));
            }
        }
        Ok(())
    }

    fn to_rule(&self) -> DegradeRule {
        DegradeRule {
            resource: self.resource.clone().unwrap_or_default(),
            limit_app: self.limit_app.clone().unwrap_or_else(|| "default".into()),
            grade: self.grade.unwrap_or(GRADE_SLOW_RATIO),
            count: self.count.unwrap_or(0.0),
            time_window: self.time_window.unwrap_or(0),
            min_request_amount: self.min_request_amount.unwrap_or(5),
            slow_ratio_threshold: self.slow_ratio_threshold.unwrap_or(1.0),
            stat_interval_ms: self.stat_interval_ms.unwrap_or(1000),
        }
    }
}
