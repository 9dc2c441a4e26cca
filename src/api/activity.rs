//! Activity log endpoint.

use axum::extract::{Query, State};
use serde::Deserialize;

use super::{respond, ApiResult};
use crate::access::{Permission, Viewer};
use crate::auth::Actor;
use crate::models::Activity;
use crate::AppState;

const DEFAULT_ACTIVITY_LIMIT: i64 = 50;
const MAX_ACTIVITY_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_ACTIVITY_LIMIT
}

/// GET /api/activity - Most recent activity, newest first.
pub async fn list_activity(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Vec<Activity>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = match viewer.require(Permission::ViewActivity) {
        Ok(()) => {
            state
                .repo
                .list_activities(query.limit.clamp(1, MAX_ACTIVITY_LIMIT))
                .await
        }
        Err(e) => Err(e),
    };
    respond(&state, revision_id, result).await
}

/// Record `viewer` doing `action` to `target`; failures are logged only.
pub(crate) async fn log_activity(state: &AppState, viewer: &Viewer, action: &str, target: &str) {
    match state.repo.record_activity(&viewer.id, action, target).await {
        Ok(_) => tracing::debug!(actor = %viewer.id, "{} {}", action, target),
        Err(e) => tracing::warn!("Failed to record activity: {}", e),
    }
}
