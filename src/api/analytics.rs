//! Analytics endpoints. Figures cover only what the acting user can see.

use axum::extract::State;

use super::{respond, ApiResult};
use crate::access::{Permission, ViewScope};
use crate::analytics::{dashboard, kpi_report, DashboardStats, KpiReport};
use crate::auth::Actor;
use crate::errors::AppError;
use crate::models::Employee;
use crate::AppState;

/// GET /api/analytics/kpi - KPI averages, rankings and leaders.
pub async fn get_kpi_report(
    State(state): State<AppState>,
    Actor(viewer): Actor,
) -> ApiResult<KpiReport> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        viewer.require(Permission::ViewAnalytics)?;
        let departments = state.repo.list_departments().await?;
        let employees: Vec<Employee> = viewer
            .retain_visible(state.repo.list_employees().await?, ViewScope::Department)
            .into_iter()
            .filter(Employee::is_active)
            .collect();
        Ok::<_, AppError>(kpi_report(&departments, &employees))
    }
    .await;
    respond(&state, revision_id, result).await
}

/// GET /api/analytics/dashboard - Task and staffing statistics.
pub async fn get_dashboard(
    State(state): State<AppState>,
    Actor(viewer): Actor,
) -> ApiResult<DashboardStats> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let departments: Vec<_> = state
            .repo
            .list_departments()
            .await?
            .into_iter()
            .filter(|d| viewer.sees_department(&d.id))
            .collect();
        let employees: Vec<Employee> = viewer
            .retain_visible(state.repo.list_employees().await?, ViewScope::Department)
            .into_iter()
            .filter(Employee::is_active)
            .collect();
        let tasks = viewer.retain_visible(state.repo.list_tasks().await?, ViewScope::Department);
        Ok::<_, AppError>(dashboard(&tasks, &employees, &departments))
    }
    .await;
    respond(&state, revision_id, result).await
}
