//! KPI rule and department endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::{error, log_activity, require_text, respond, ApiResult};
use crate::access::{Permission, ViewScope};
use crate::analytics::department_kpis;
use crate::auth::Actor;
use crate::errors::AppError;
use crate::models::{CreateKpiRuleRequest, Department, KpiRule};
use crate::AppState;

/// A department with its headcount, KPI and workload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentOverview {
    #[serde(flatten)]
    pub department: Department,
    pub employee_count: usize,
    pub average_kpi: f64,
    pub task_count: usize,
    pub open_tasks: usize,
}

/// GET /api/kpi-rules - List KPI rule templates.
pub async fn list_kpi_rules(
    State(state): State<AppState>,
    Actor(_viewer): Actor,
) -> ApiResult<Vec<KpiRule>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = state.repo.list_kpi_rules().await;
    respond(&state, revision_id, result).await
}

/// POST /api/kpi-rules - Define a KPI rule.
pub async fn create_kpi_rule(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Json(request): Json<CreateKpiRuleRequest>,
) -> ApiResult<KpiRule> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        viewer.require(Permission::ManageKpiRules)?;
        require_text(&request.title, "Rule title")?;
        if request.default_points < 0 || request.default_hours < 0.0 {
            return Err(AppError::Validation(
                "Points and hours must not be negative".to_string(),
            ));
        }

        let rule = state.repo.create_kpi_rule(&request).await?;
        log_activity(&state, &viewer, "defined KPI rule", &rule.title).await;
        Ok::<_, AppError>(rule)
    }
    .await;
    respond(&state, revision_id, result).await
}

/// DELETE /api/kpi-rules/{id} - Delete a KPI rule.
pub async fn delete_kpi_rule(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = viewer.require(Permission::ManageKpiRules) {
        return error(e, revision_id);
    }
    let result = state.repo.delete_kpi_rule(&id).await;
    if result.is_ok() {
        log_activity(&state, &viewer, "deleted KPI rule", &id).await;
    }
    respond(&state, revision_id, result).await
}

/// GET /api/departments - Departments overview for managers.
pub async fn list_departments(
    State(state): State<AppState>,
    Actor(viewer): Actor,
) -> ApiResult<Vec<DepartmentOverview>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        viewer.require(Permission::ViewDepartments)?;
        let departments: Vec<Department> = state
            .repo
            .list_departments()
            .await?
            .into_iter()
            .filter(|d| viewer.sees_department(&d.id))
            .collect();
        let employees: Vec<_> = viewer
            .retain_visible(state.repo.list_employees().await?, ViewScope::Department)
            .into_iter()
            .filter(|e| e.is_active())
            .collect();
        let tasks = viewer.retain_visible(state.repo.list_tasks().await?, ViewScope::Department);

        let kpis = department_kpis(&departments, &employees);
        Ok::<_, AppError>(
            departments
                .into_iter()
                .zip(kpis)
                .map(|(department, kpi)| {
                    let own = tasks.iter().filter(|t| t.department_id == department.id);
                    DepartmentOverview {
                        employee_count: kpi.employee_count,
                        average_kpi: kpi.average_kpi,
                        task_count: own.clone().count(),
                        open_tasks: own.filter(|t| t.status.is_open()).count(),
                        department,
                    }
                })
                .collect(),
        )
    }
    .await;
    respond(&state, revision_id, result).await
}
