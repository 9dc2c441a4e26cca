//! Employee API endpoints: directory, registration, approval and roles.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{error, log_activity, require_text, respond, ApiResult};
use crate::access::{Permission, ViewScope, Viewer};
use crate::analytics::is_archived;
use crate::auth::Actor;
use crate::db::check_version;
use crate::errors::AppError;
use crate::models::{
    ApproveEmployeeRequest, Employee, EmployeeStatus, RegisterEmployeeRequest, Role, Task,
    UpdateRoleRequest,
};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct EmployeeListQuery {
    #[serde(default)]
    pub scope: ViewScope,
}

/// An employee as shown to a particular viewer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeView {
    #[serde(flatten)]
    pub employee: Employee,
    /// Profile reads as archived: every task done and the viewer is not staff
    pub archived: bool,
}

impl EmployeeView {
    fn new(viewer: &Viewer, employee: Employee, tasks: &[Task]) -> Self {
        Self {
            archived: is_archived(viewer, &employee, tasks),
            employee,
        }
    }
}

/// Performance summary for one employee.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightResponse {
    pub employee_id: String,
    pub text: String,
}

/// GET /api/employees - Active employees visible to the acting user.
pub async fn list_employees(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Query(query): Query<EmployeeListQuery>,
) -> ApiResult<Vec<EmployeeView>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let employees = state.repo.list_employees().await?;
        let tasks = state.repo.list_tasks().await?;
        Ok::<_, AppError>(
            viewer
                .retain_visible(employees, query.scope)
                .into_iter()
                .filter(Employee::is_active)
                .map(|e| EmployeeView::new(&viewer, e, &tasks))
                .collect(),
        )
    }
    .await;
    respond(&state, revision_id, result).await
}

/// GET /api/employees/pending - Registrations waiting for approval.
pub async fn list_pending_employees(
    State(state): State<AppState>,
    Actor(viewer): Actor,
) -> ApiResult<Vec<Employee>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = viewer.require(Permission::ManageEmployees) {
        return error(e, revision_id);
    }
    let result = state.repo.list_pending_employees().await;
    respond(&state, revision_id, result).await
}

/// POST /api/employees/register - Self-service sign-up; needs no acting user.
pub async fn register_employee(
    State(state): State<AppState>,
    Json(request): Json<RegisterEmployeeRequest>,
) -> ApiResult<Employee> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        require_text(&request.name, "Name")?;
        require_text(&request.email, "Email")?;

        let email = request.email.trim();
        let taken = state
            .repo
            .list_employees()
            .await?
            .iter()
            .any(|e| e.email.eq_ignore_ascii_case(email));
        if taken {
            return Err(AppError::Validation(format!(
                "Email {} is already registered",
                email
            )));
        }

        let employee = state.repo.register_employee(&request).await?;
        tracing::info!(employee = %employee.id, "New registration awaiting approval");
        Ok::<_, AppError>(employee)
    }
    .await;
    respond(&state, revision_id, result).await
}

/// GET /api/employees/{id} - Get a single employee.
pub async fn get_employee(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Path(id): Path<String>,
) -> ApiResult<EmployeeView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let employee = load_employee(&state, &viewer, &id).await?;
        let tasks = state.repo.list_tasks().await?;
        Ok::<_, AppError>(EmployeeView::new(&viewer, employee, &tasks))
    }
    .await;
    respond(&state, revision_id, result).await
}

/// POST /api/employees/{id}/approve - Activate a pending registration.
pub async fn approve_employee(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Path(id): Path<String>,
    Json(request): Json<ApproveEmployeeRequest>,
) -> ApiResult<Employee> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = approve_inner(&state, &viewer, &id, request).await;
    respond(&state, revision_id, result).await
}

async fn approve_inner(
    state: &AppState,
    viewer: &Viewer,
    id: &str,
    request: ApproveEmployeeRequest,
) -> Result<Employee, AppError> {
    viewer.require(Permission::ManageEmployees)?;
    check_role_grant(state, viewer, request.role, &request.department_id).await?;

    // Pending accounts have no real department yet, so any manager may see them
    let mut employee = state
        .repo
        .get_employee(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", id)))?;
    if employee.status != EmployeeStatus::Pending {
        return Err(AppError::InvalidTransition(format!(
            "Employee {} is already active",
            id
        )));
    }

    employee.status = EmployeeStatus::Active;
    employee.role = request.role;
    employee.department_id = request.department_id;

    let employee = state.repo.update_employee(&employee).await?;
    log_activity(state, viewer, "approved", &employee.name).await;
    Ok(employee)
}

/// PUT /api/employees/{id}/role - Change an employee's role or department.
pub async fn update_employee_role(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Path(id): Path<String>,
    Json(request): Json<UpdateRoleRequest>,
) -> ApiResult<Employee> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = update_role_inner(&state, &viewer, &id, request).await;
    respond(&state, revision_id, result).await
}

async fn update_role_inner(
    state: &AppState,
    viewer: &Viewer,
    id: &str,
    request: UpdateRoleRequest,
) -> Result<Employee, AppError> {
    viewer.require(Permission::ManageEmployees)?;
    let mut employee = load_employee(state, viewer, id).await?;
    check_version(request.expected_version, employee.version)?;
    if employee.role.is_admin() && !viewer.role.is_admin() {
        return Err(AppError::Forbidden(
            "Only an admin can change an admin's role".to_string(),
        ));
    }

    let department_id = request
        .department_id
        .clone()
        .unwrap_or_else(|| employee.department_id.clone());
    check_role_grant(state, viewer, request.role, &department_id).await?;

    employee.role = request.role;
    employee.department_id = department_id;
    if request.kpi_target.is_some() {
        employee.kpi_target = request.kpi_target;
    }

    let employee = state.repo.update_employee(&employee).await?;
    log_activity(
        state,
        viewer,
        &format!("changed role to {}", employee.role),
        &employee.name,
    )
    .await;
    Ok(employee)
}

/// GET /api/employees/{id}/insight - Generated performance summary.
pub async fn get_employee_insight(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Path(id): Path<String>,
) -> ApiResult<InsightResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let employee = load_employee(&state, &viewer, &id).await?;
        let tasks: Vec<Task> = state
            .repo
            .list_tasks()
            .await?
            .into_iter()
            .filter(|t| t.assigned_to == employee.id)
            .collect();

        let text = state.insights.employee_report(&employee, &tasks).await;
        Ok::<_, AppError>(InsightResponse {
            employee_id: employee.id,
            text,
        })
    }
    .await;
    respond(&state, revision_id, result).await
}

/// Fetch an employee the viewer may see; hidden employees read as missing.
async fn load_employee(state: &AppState, viewer: &Viewer, id: &str) -> Result<Employee, AppError> {
    let employee = state
        .repo
        .get_employee(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", id)))?;
    viewer.require_visible(&employee, "Employee", id)?;
    Ok(employee)
}

/// Department managers may only staff their own department and never mint admins.
async fn check_role_grant(
    state: &AppState,
    viewer: &Viewer,
    role: Role,
    department_id: &str,
) -> Result<(), AppError> {
    if role.is_admin() && !viewer.role.is_admin() {
        return Err(AppError::Forbidden(
            "Only an admin can grant the ADMIN role".to_string(),
        ));
    }
    if !viewer.sees_department(department_id) {
        return Err(AppError::Forbidden(format!(
            "Cannot assign employees to department {}",
            department_id
        )));
    }
    if !state.repo.department_exists(department_id).await? {
        return Err(AppError::Validation(format!(
            "Unknown department {}",
            department_id
        )));
    }
    Ok(())
}
