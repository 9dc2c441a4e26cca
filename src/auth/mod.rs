//! Authentication: PSK gate for the API and the acting-user extractor.
//!
//! The PSK check uses constant-time comparison to mitigate timing attacks.
//! The acting user is named per request by the `x-actor-id` header and must
//! be an approved employee.

use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;

use crate::access::Viewer;
use crate::errors::{codes, AppError, AppErrorWithRevision, ErrorDetails, ErrorResponse};
use crate::AppState;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header naming the employee on whose behalf the request runs.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// PSK authentication layer function that takes the expected PSK as a parameter.
pub async fn psk_auth_layer(
    expected_psk: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    // If no PSK is configured, allow all requests (dev mode)
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        });

    // Constant-time comparison to prevent timing attacks
    let verdict = provided.map(|key| constant_time_compare(key, &expected));

    match verdict {
        Some(true) => next.run(request).await,
        Some(false) => unauthorized_response("Invalid API key"),
        None => unauthorized_response("Missing or invalid API key"),
    }
}

/// The approved employee making the request.
#[derive(Debug, Clone)]
pub struct Actor(pub Viewer);

impl FromRequestParts<AppState> for Actor {
    type Rejection = AppErrorWithRevision;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
        let reject = |error: AppError| AppErrorWithRevision { error, revision_id };

        let actor_id = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                reject(AppError::Unauthorized(format!(
                    "Missing {} header",
                    ACTOR_HEADER
                )))
            })?;

        let employee = state
            .repo
            .get_employee(actor_id)
            .await
            .map_err(reject)?
            .ok_or_else(|| {
                reject(AppError::Unauthorized(format!(
                    "Unknown actor {}",
                    actor_id
                )))
            })?;

        if !employee.is_active() {
            tracing::debug!(actor = %employee.id, "rejected pending account");
            return Err(reject(AppError::Forbidden(format!(
                "Account {} is awaiting approval",
                employee.id
            ))));
        }

        Ok(Actor(Viewer::from(&employee)))
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Create an unauthorized response.
fn unauthorized_response(message: &str) -> Response {
    let body = ErrorResponse {
        success: false,
        error: ErrorDetails {
            code: codes::UNAUTHORIZED.to_string(),
            message: message.to_string(),
            details: None,
        },
        revision_id: 0,
    };

    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("test-key-123", "test-key-124"));
    }

    #[test]
    fn test_constant_time_compare_different_lengths() {
        assert!(!constant_time_compare("short", "much-longer-key"));
    }

    #[test]
    fn test_constant_time_compare_empty() {
        assert!(constant_time_compare("", ""));
        assert!(!constant_time_compare("", "not-empty"));
    }
}
