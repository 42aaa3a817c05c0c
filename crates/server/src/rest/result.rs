use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::repository::RepositoryError;
use crate::sync::SyncError;

/// Response envelope shared by every rule endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResult<T> {
    pub success: bool,
    pub code: i32,
    pub msg: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            code: 0,
            msg: None,
            data: Some(data),
        }
    }

    pub fn ok_empty() -> Self {
        Self {
            success: true,
            code: 0,
            msg: None,
            data: None,
        }
    }

    pub fn fail(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            code: -1,
            msg: Some(msg.into()),
            data: None,
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Invalid(String),
    NotFound(String),
    Repository(RepositoryError),
}

impl ApiError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Repository(RepositoryError::InvalidArgument(_)) => StatusCode::BAD_REQUEST,
            Self::Repository(RepositoryError::Sync(SyncError::Store(_))) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Repository(RepositoryError::Sync(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(msg) | Self::NotFound(msg) => f.write_str(msg),
            Self::Repository(e) => write!(f, "{e}"),
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(e: RepositoryError) -> Self {
        Self::Repository(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "rule request failed");
        }
        (status, Json(ApiResult::<()>::fail(self.to_string()))).into_response()
    }
}
