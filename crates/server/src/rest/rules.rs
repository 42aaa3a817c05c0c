use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

use flowguard_common::clock::now_ms;
use flowguard_common::rule::RuleEntity;

use crate::metrics::sync_metrics::SyncMetrics;
use crate::repository::{RuleRepository, UpdateOutcome};
use crate::rest::result::{ApiError, ApiResult};

/// Per-category handler state.
pub struct RuleState<T: RuleEntity> {
    pub repo: RuleRepository<T>,
    pub metrics: Arc<SyncMetrics>,
}

impl<T: RuleEntity> Clone for RuleState<T> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AppQuery {
    pub app: Option<String>,
}

/// CRUD routes for one rule category, mounted under `/v2/{kind}`.
pub fn routes<T: RuleEntity>(state: RuleState<T>) -> Router {
    Router::new()
        .route("/rules", get(list_rules::<T>))
        .route("/rule", post(create_rule::<T>))
        .route(
            "/rule/{id}",
            get(get_rule::<T>)
                .put(update_rule::<T>)
                .delete(delete_rule::<T>),
        )
        .with_state(state)
}

fn require_app(app: Option<String>) -> Result<String, ApiError> {
    match app {
        Some(app) if !app.trim().is_empty() => Ok(app),
        _ => Err(ApiError::invalid("app can't be null or empty")),
    }
}

fn require_id(id: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    match id {
        Ok(Path(id)) if id > 0 => Ok(id),
        _ => Err(ApiError::invalid("Invalid id")),
    }
}

fn require_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(entity)| entity)
        .map_err(|e| ApiError::invalid(format!("invalid body: {}", e.body_text())))
}

fn not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("id {id} does not exist"))
}

pub async fn list_rules<T: RuleEntity>(
    State(state): State<RuleState<T>>,
    Query(q): Query<AppQuery>,
) -> Result<Json<ApiResult<Vec<T>>>, ApiError> {
    state.metrics.inc_rest_requests();
    let app = require_app(q.app)?;
    let rules = state.repo.list(&app).await?;
    Ok(Json(ApiResult::ok(rules)))
}

pub async fn get_rule<T: RuleEntity>(
    State(state): State<RuleState<T>>,
    id: Result<Path<i64>, PathRejection>,
    Query(q): Query<AppQuery>,
) -> Result<Json<ApiResult<T>>, ApiError> {
    state.metrics.inc_rest_requests();
    let id = require_id(id)?;
    let app = require_app(q.app)?;
    match state.repo.find_by_id(&app, id).await? {
        Some(rule) => Ok(Json(ApiResult::ok(rule))),
        None => Err(not_found(id)),
    }
}

pub async fn create_rule<T: RuleEntity>(
    State(state): State<RuleState<T>>,
    body: Result<Json<T>, JsonRejection>,
) -> Result<Json<ApiResult<T>>, ApiError> {
    state.metrics.inc_rest_requests();
    let mut entity = require_body(body)?;
    entity
        .validate()
        .map_err(|e| ApiError::invalid(e.to_string()))?;

    let now = now_ms();
    let meta = entity.meta_mut();
    meta.gmt_create = Some(now);
    meta.gmt_modified = Some(now);

    let saved = state.repo.save(entity).await?;
    Ok(Json(ApiResult::ok(saved)))
}

pub async fn update_rule<T: RuleEntity>(
    State(state): State<RuleState<T>>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<T>, JsonRejection>,
) -> Result<Json<ApiResult<T>>, ApiError> {
    state.metrics.inc_rest_requests();
    let id = require_id(id)?;
    let mut entity = require_body(body)?;
    let app = require_app(Some(entity.app().to_string()))?;

    if state.repo.find_by_id(&app, id).await?.is_none() {
        return Err(not_found(id));
    }
    entity.meta_mut().id = Some(id);

    match state.repo.update(entity).await? {
        UpdateOutcome::Updated(rule) => Ok(Json(ApiResult::ok(rule))),
        UpdateOutcome::Missing | UpdateOutcome::Empty => Err(not_found(id)),
    }
}

pub async fn delete_rule<T: RuleEntity>(
    State(state): State<RuleState<T>>,
    id: Result<Path<i64>, PathRejection>,
    Query(q): Query<AppQuery>,
) -> Result<Json<ApiResult<i64>>, ApiError> {
    state.metrics.inc_rest_requests();
    let id = require_id(id)?;
    let app = require_app(q.app)?;

    // Deleting an id that is already gone succeeds with no data.
    match state.repo.delete(&app, id).await? {
        0 => Ok(Json(ApiResult::ok_empty())),
        _ => Ok(Json(ApiResult::ok(id))),
    }
}
