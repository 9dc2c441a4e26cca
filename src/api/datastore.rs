//! Datastore API endpoints.

use axum::extract::State;

use super::projects::project_view;
use super::sprints::sprint_visible;
use super::{respond, today, ApiResult};
use crate::access::ViewScope;
use crate::auth::Actor;
use crate::db::SCHEMA_VERSION;
use crate::errors::AppError;
use crate::models::{Datastore, RevisionInfo, SprintView};
use crate::AppState;

/// GET /api/datastore - Everything the acting user can see, in one snapshot.
pub async fn get_datastore(State(state): State<AppState>, Actor(viewer): Actor) -> ApiResult<Datastore> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let info = state.repo.get_revision_info().await?;
        let all_tasks = state.repo.list_tasks().await?;
        let all_projects = state.repo.list_projects().await?;
        let today = today();

        let sprints = state
            .repo
            .list_sprints()
            .await?
            .into_iter()
            .filter(|s| sprint_visible(&viewer, &s.project_id, &all_projects))
            .map(|s| SprintView::new(s, today))
            .collect();
        let projects = viewer
            .filter_visible(&all_projects, ViewScope::Department)
            .into_iter()
            .map(|p| project_view(p, &all_tasks))
            .collect();

        Ok::<_, AppError>(Datastore {
            schema_version: SCHEMA_VERSION,
            generated_at: info.generated_at,
            revision_id: info.revision_id,
            departments: state.repo.list_departments().await?,
            employees: viewer
                .retain_visible(state.repo.list_employees().await?, ViewScope::Department),
            tasks: viewer.retain_visible(all_tasks, ViewScope::Department),
            projects,
            sprints,
            kpi_rules: state.repo.list_kpi_rules().await?,
        })
    }
    .await;
    respond(&state, revision_id, result).await
}

/// GET /api/datastore/revision - Get the current revision info.
pub async fn get_revision(State(state): State<AppState>) -> ApiResult<RevisionInfo> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = state.repo.get_revision_info().await;
    respond(&state, revision_id, result).await
}
