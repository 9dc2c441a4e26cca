//! REST API module.
//!
//! Contains all API routes and handlers following the frontend contract.

mod activity;
mod analytics;
mod datastore;
mod employees;
mod hr;
mod projects;
mod search;
mod settings;
mod sprints;
mod tasks;

pub use activity::*;
pub use analytics::*;
pub use datastore::*;
pub use employees::*;
pub use hr::*;
pub use projects::*;
pub use search::*;
pub use settings::*;
pub use sprints::*;
pub use tasks::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::analytics::FULL_WEIGHT;
use crate::errors::AppError;
use crate::AppState;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub revision_id: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, revision_id: i64) -> Self {
        Self {
            success: true,
            data,
            revision_id,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, crate::errors::AppErrorWithRevision>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, revision_id: i64) -> ApiResult<T> {
    Ok(ApiResponse::new(data, revision_id))
}

/// Create an error API response.
pub fn error<T: Serialize>(err: AppError, revision_id: i64) -> ApiResult<T> {
    Err(crate::errors::AppErrorWithRevision {
        error: err,
        revision_id,
    })
}

/// Wrap a handler outcome in the envelope.
///
/// Successes report the revision after the handler ran, errors the one
/// read before it.
pub async fn respond<T: Serialize>(
    state: &AppState,
    revision_id: i64,
    result: Result<T, AppError>,
) -> ApiResult<T> {
    match result {
        Ok(data) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(data, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// Fail with `Validation` when `value` is blank.
pub(crate) fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        Err(AppError::Validation(format!("{} is required", field)))
    } else {
        Ok(())
    }
}

/// Fail with `Validation` unless `weight` is a percentage.
pub(crate) fn check_weight(weight: i64) -> Result<(), AppError> {
    if (0..=FULL_WEIGHT).contains(&weight) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Weight must be between 0 and {}, got {}",
            FULL_WEIGHT, weight
        )))
    }
}

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
