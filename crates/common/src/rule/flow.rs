use serde::{Deserialize, Serialize};

use super::{is_blank, RuleEntity, RuleError, RuleMeta};
use crate::data_id::FLOW_DATA_ID_POSTFIX;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterFlowConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<i64>,
    #[serde(default)]
    pub threshold_type: i32,
    #[serde(default = "yes")]
    pub fallback_to_local_when_fail: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowRuleEntity {
    #[serde(flatten)]
    pub meta: RuleMeta,
    pub limit_app: Option<String>,
    pub resource: Option<String>,
    pub grade: Option<i32>,
    pub count: Option<f64>,
    pub strategy: Option<i32>,
    pub ref_resource: Option<String>,
    pub control_behavior: Option<i32>,
    pub warm_up_period_sec: Option<i32>,
    pub max_queueing_time_ms: Option<i32>,
    #[serde(default)]
    pub cluster_mode: bool,
    pub cluster_config: Option<ClusterFlowConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowRule {
    pub resource: String,
    pub limit_app: String,
    pub grade: i32,
    pub count: f64,
    pub strategy: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_resource: Option<String>,
    pub control_behavior: i32,
    pub warm_up_period_sec: i32,
    pub max_queueing_time_ms: i32,
    pub cluster_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_config: Option<ClusterFlowConfig>,
}

impl RuleEntity for FlowRuleEntity {
    type Rule = FlowRule;

    const KIND: &'static str = "flow";
    const DATA_ID_POSTFIX: &'static str = FLOW_DATA_ID_POSTFIX;

    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RuleMeta {
        &mut self.meta
    }

    /// A cluster-assigned flow id takes precedence over the local id.
    fn normalize(&mut self, app: &str) {
        self.meta.app = app.to_string();
        if let Some(flow_id) = self.cluster_config.as_ref().and_then(|c| c.flow_id) {
            self.meta.id = Some(flow_id);
        }
    }

    fn validate(&self) -> Result<(), RuleError> {
        if self.meta.app.trim().is_empty() {
            return Err(RuleError::new("app can't be null or empty"));
        }
        if is_blank(self.limit_app.as_deref()) {
            return Err(RuleError::new("limitApp can't be null or empty"));
        }
        if is_blank(self.resource.as_deref()) {
            return Err(RuleError::new("resource can't be null or empty"));
        }
        let grade = self
            .grade
            .ok_or_else(|| RuleError::new("grade can't be null"))?;
        if grade != 0 && grade != 1 {
            return Err(RuleError::new(format!(
                "grade must be 0 or 1, but {grade} got"
            )));
        }
        match self.count {
            Some(c) if c >= 0.0 => {}
            _ => return Err(RuleError::new("count should be at lease zero")),
        }
        let strategy = self
            .strategy
            .ok_or_else(|| RuleError::new("strategy can't be null"))?;
        if strategy != 0 && is_blank(self.ref_resource.as_deref()) {
            return Err(RuleError::new(
                "refResource can't be null or empty when strategy!=0",
            ));
        }
        let behavior = self
            .control_behavior
            .ok_or_else(|| RuleError::new("controlBehavior can't be null"))?;
        if behavior == 1 && self.warm_up_period_sec.is_none() {
            return Err(RuleError::new(
                "warmUpPeriodSec can't be null when controlBehavior==1",
            ));
        }
        if behavior == 2 && self.max_queueing_time_ms.is_none() {
            return Err(RuleError::new(
                "maxQueueingTimeMs can't be null when controlBehavior==2",
            ));
        }
        if self.cluster_mode && self.cluster_config.is_none() {
            return Err(RuleError::new("cluster config should be valid"));
        }
        Ok(())
    }

    fn to_rule(&self) -> FlowRule {
        FlowRule {
            resource: self.resource.clone().unwrap_or_default(),
            limit_app: self.limit_app.clone().unwrap_or_else(|| "default".into()),
            grade: self.grade.unwrap_or(1),
            count: self.count.unwrap_or(0.0),
            strategy: self.strategy.unwrap_or(0),
            ref_resource: self.ref_resource.clone(),
            control_behavior: self.control_behavior.unwrap_or(0),
            warm_up_period_sec: self.warm_up_period_sec.unwrap_or(10),
            max_queueing_time_ms: self.max_queueing_time_ms.unwrap_or(500),
            cluster_mode: self.cluster_mode,
            cluster_config: self.cluster_config.clone(),
        }
    }
}

fn yes() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> FlowRuleEntity {
        FlowRuleEntity {
            meta: RuleMeta {
                app: "orderSvc".into(),
                ..Default::default()
            },
            limit_app: Some("default".into()),
            resource: Some("/api".into()),
            grade: Some(1),
            count: Some(10.0),
            strategy: Some(0),
            control_behavior: Some(0),
            ..Default::default()
        }
    }

    fn err_of(rule: FlowRuleEntity) -> String {
        rule.validate().unwrap_err().0
    }

    #[test]
    fn valid_rule_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn missing_resource_rejected() {
        let mut r = valid();
        r.resource = Some(" ".into());
        assert_eq!(err_of(r), "resource can't be null or empty");
    }

    #[test]
    fn grade_out_of_range_rejected() {
        let mut r = valid();
        r.grade = Some(2);
        assert_eq!(err_of(r), "grade must be 0 or 1, but 2 got");
    }

    #[test]
    fn negative_count_rejected() {
        let mut r = valid();
        r.count = Some(-1.0);
        assert!(err_of(r).contains("count"));
    }

    #[test]
    fn relate_strategy_needs_ref_resource() {
        let mut r = valid();
        r.strategy = Some(1);
        assert!(err_of(r).contains("refResource"));
    }

    #[test]
    fn warm_up_behavior_needs_period() {
        let mut r = valid();
        r.control_behavior = Some(1);
        assert!(err_of(r.clone()).contains("warmUpPeriodSec"));
        r.warm_up_period_sec = Some(10);
        assert!(r.validate().is_ok());
    }

    #[test]
    fn rate_limiter_behavior_needs_queueing_time() {
        let mut r = valid();
        r.control_behavior = Some(2);
        assert!(err_of(r).contains("maxQueueingTimeMs"));
    }

    #[test]
    fn cluster_mode_needs_config() {
        let mut r = valid();
        r.cluster_mode = true;
        assert_eq!(err_of(r), "cluster config should be valid");
    }

    #[test]
    fn normalize_adopts_cluster_flow_id() {
        let mut r = valid();
        r.meta.id = Some(2);
        r.cluster_config = Some(ClusterFlowConfig {
            flow_id: Some(9001),
            ..Default::default()
        });
        r.normalize("orderSvc");
        assert_eq!(r.meta.id, Some(9001));
    }

    #[test]
    fn deserializes_dashboard_json() {
        let json = r#"{
            "id": 3,
            "app": "orderSvc",
            "limitApp": "default",
            "resource": "/api",
            "grade": 1,
            "count": 10.0,
            "strategy": 0,
            "controlBehavior": 0,
            "clusterMode": false,
            "gmtCreate": 1700000000000
        }"#;
        let r: FlowRuleEntity = serde_json::from_str(json).unwrap();
        assert_eq!(r.meta.id, Some(3));
        assert_eq!(r.meta.gmt_create, Some(1_700_000_000_000));
        assert_eq!(r.limit_app.as_deref(), Some("default"));
    }

    #[test]
    fn production_rule_drops_bookkeeping() {
        let mut r = valid();
        r.meta.id = Some(5);
        let json = serde_json::to_value(r.to_rule()).unwrap();
        assert!(json.get("id").is_none());
        assert!(json.get("app").is_none());
        assert_eq!(json["resource"], "/api");
        assert_eq!(json["warmUpPeriodSec"], 10);
    }
}
