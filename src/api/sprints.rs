//! Sprint API endpoints: planning, lifecycle changes and extensions.
//!
//! A sprint is visible to whoever can see its project.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{log_activity, now_rfc3339, require_text, respond, today, ApiResult};
use crate::access::{Permission, Viewer};
use crate::auth::Actor;
use crate::db::check_version;
use crate::errors::AppError;
use crate::models::{
    CreateSprintRequest, ExtendSprintRequest, Project, Sprint, SprintAction, SprintStatus,
    SprintStatusRequest, SprintView,
};
use crate::AppState;

/// Whether `viewer` can see a sprint of `project_id`, given the known projects.
///
/// Sprints of unknown projects are visible to ADMIN only.
pub(crate) fn sprint_visible(viewer: &Viewer, project_id: &str, projects: &[Project]) -> bool {
    match projects.iter().find(|p| p.id == project_id) {
        Some(project) => viewer.can_see(project),
        None => viewer.role.is_admin(),
    }
}

/// GET /api/sprints - Sprints of the projects visible to the acting user.
pub async fn list_sprints(
    State(state): State<AppState>,
    Actor(viewer): Actor,
) -> ApiResult<Vec<SprintView>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let projects = state.repo.list_projects().await?;
        let today = today();
        Ok::<_, AppError>(
            state
                .repo
                .list_sprints()
                .await?
                .into_iter()
                .filter(|s| sprint_visible(&viewer, &s.project_id, &projects))
                .map(|s| SprintView::new(s, today))
                .collect(),
        )
    }
    .await;
    respond(&state, revision_id, result).await
}

/// POST /api/sprints - Plan a new sprint.
pub async fn create_sprint(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Json(request): Json<CreateSprintRequest>,
) -> ApiResult<SprintView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = create_sprint_inner(&state, &viewer, request).await;
    respond(&state, revision_id, result).await
}

async fn create_sprint_inner(
    state: &AppState,
    viewer: &Viewer,
    request: CreateSprintRequest,
) -> Result<SprintView, AppError> {
    viewer.require(Permission::ManageSprints)?;
    require_text(&request.name, "Sprint name")?;

    let project = state
        .repo
        .get_project(&request.project_id)
        .await?
        .filter(|p| viewer.can_see(p))
        .ok_or_else(|| AppError::Validation(format!("Unknown project {}", request.project_id)))?;

    let today = today();
    let (start_date, end_date) = request.schedule(today);
    if end_date < start_date {
        return Err(AppError::Validation(
            "Sprint end date is before its start date".to_string(),
        ));
    }

    let now = now_rfc3339();
    let sprint = Sprint {
        id: format!("spr-{}", uuid::Uuid::new_v4().simple()),
        name: request.name.trim().to_string(),
        start_date,
        end_date,
        status: SprintStatus::Planned,
        project_id: project.id,
        extensions: Vec::new(),
        created_at: now.clone(),
        updated_at: now,
        version: 1,
    };

    state.repo.insert_sprint(&sprint).await?;
    log_activity(state, viewer, "planned sprint", &sprint.name).await;

    Ok(SprintView::new(sprint, today))
}

/// PUT /api/sprints/{id}/status - Activate, close or re-open a sprint.
pub async fn update_sprint_status(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Path(id): Path<String>,
    Json(request): Json<SprintStatusRequest>,
) -> ApiResult<SprintView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let mut sprint = load_sprint(&state, &viewer, &id).await?;
        check_version(request.expected_version, sprint.version)?;

        let action = sprint.transition_to(request.status, viewer.role)?;
        let sprint = state.repo.update_sprint(&sprint).await?;

        tracing::info!(sprint = %sprint.id, action = action.as_str(), actor = %viewer.id, "Sprint lifecycle change");
        let verb = match action {
            SprintAction::Activate => "activated sprint",
            SprintAction::Close => "closed sprint",
            SprintAction::Reopen => "re-opened sprint",
            SprintAction::Extend => "extended sprint",
        };
        log_activity(&state, &viewer, verb, &sprint.name).await;
        Ok::<_, AppError>(SprintView::new(sprint, today()))
    }
    .await;
    respond(&state, revision_id, result).await
}

/// POST /api/sprints/{id}/extensions - Push out the end date of an active sprint.
pub async fn extend_sprint(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Path(id): Path<String>,
    Json(request): Json<ExtendSprintRequest>,
) -> ApiResult<SprintView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let mut sprint = load_sprint(&state, &viewer, &id).await?;
        check_version(request.expected_version, sprint.version)?;
        require_text(&request.reason, "Extension reason")?;

        sprint.extend(
            viewer.role,
            &viewer.id,
            request.new_end_date,
            request.reason.trim(),
            now_rfc3339(),
        )?;
        let sprint = state.repo.update_sprint(&sprint).await?;

        log_activity(
            &state,
            &viewer,
            &format!("extended sprint to {}", sprint.end_date),
            &sprint.name,
        )
        .await;
        Ok::<_, AppError>(SprintView::new(sprint, today()))
    }
    .await;
    respond(&state, revision_id, result).await
}

/// DELETE /api/sprints/{id} - Delete a sprint.
pub async fn delete_sprint(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        viewer.require(Permission::ManageSprints)?;
        let sprint = load_sprint(&state, &viewer, &id).await?;
        state.repo.delete_sprint(&id).await?;
        log_activity(&state, &viewer, "deleted sprint", &sprint.name).await;
        Ok::<_, AppError>(())
    }
    .await;
    respond(&state, revision_id, result).await
}

/// Fetch a sprint the viewer may see; hidden sprints read as missing.
async fn load_sprint(state: &AppState, viewer: &Viewer, id: &str) -> Result<Sprint, AppError> {
    let sprint = state
        .repo
        .get_sprint(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Sprint {} not found", id)))?;
    let projects = state.repo.list_projects().await?;
    if !sprint_visible(viewer, &sprint.project_id, &projects) {
        return Err(AppError::NotFound(format!("Sprint {} not found", id)));
    }
    Ok(sprint)
}
