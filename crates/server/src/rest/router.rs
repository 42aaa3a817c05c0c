use axum::routing::get;
use axum::Router;
use std::sync::Arc;

use flowguard_common::rule::{
    AuthorityRuleEntity, DegradeRuleEntity, FlowRuleEntity, RuleEntity, SystemRuleEntity,
};

use crate::metrics::sync_metrics::SyncMetrics;
use crate::repository::{RuleRepository, SyncedRuleSource};
use crate::sync::ConfigSynchronizer;

use super::rules::{self, RuleState};
use super::{health, metrics};

#[derive(Clone)]
pub struct AppState {
    pub flow: RuleRepository<FlowRuleEntity>,
    pub degrade: RuleRepository<DegradeRuleEntity>,
    pub system: RuleRepository<SystemRuleEntity>,
    pub authority: RuleRepository<AuthorityRuleEntity>,
    pub metrics: Arc<SyncMetrics>,
}

impl AppState {
    /// One repository per category, all publishing through `sync`.
    pub fn new(sync: Arc<ConfigSynchronizer>, metrics: Arc<SyncMetrics>) -> Self {
        Self {
            flow: synced(&sync),
            degrade: synced(&sync),
            system: synced(&sync),
            authority: synced(&sync),
            metrics,
        }
    }

    fn rule_state<T: RuleEntity>(&self, repo: RuleRepository<T>) -> RuleState<T> {
        RuleState {
            repo,
            metrics: Arc::clone(&self.metrics),
        }
    }
}

fn synced<T: RuleEntity>(sync: &Arc<ConfigSynchronizer>) -> RuleRepository<T> {
    RuleRepository::new(Arc::new(SyncedRuleSource::<T>::new(Arc::clone(sync))))
}

pub fn router(state: AppState) -> Router {
    let base = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/ready", get(health::ready))
        .route("/metrics", get(metrics::metrics))
        .with_state(Arc::clone(&state.metrics));

    let base = nest_rules(base, state.rule_state(state.flow.clone()));
    let base = nest_rules(base, state.rule_state(state.degrade.clone()));
    let base = nest_rules(base, state.rule_state(state.system.clone()));
    nest_rules(base, state.rule_state(state.authority.clone()))
}

fn nest_rules<T: RuleEntity>(router: Router, state: RuleState<T>) -> Router {
    router.nest(&format!("/v2/{}", T::KIND), rules::routes(state))
}
