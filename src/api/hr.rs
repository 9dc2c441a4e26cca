//! Attendance and leave endpoints.
//!
//! Records are visible to whoever can see the employee they belong to.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Local;

use super::{log_activity, now_rfc3339, respond, ApiResult};
use crate::access::{Permission, Viewer};
use crate::auth::Actor;
use crate::errors::AppError;
use crate::models::{
    AttendanceRecord, AttendanceStatus, CreateLeaveRequest, Employee, LeaveDecisionRequest,
    LeaveRequest, LeaveStatus,
};
use crate::AppState;

/// Whether `viewer` may see records of `employee_id`.
fn owner_visible(viewer: &Viewer, employee_id: &str, employees: &HashMap<String, Employee>) -> bool {
    match employees.get(employee_id) {
        Some(employee) => viewer.can_see(employee),
        None => viewer.role.is_admin(),
    }
}

async fn employee_index(state: &AppState) -> Result<HashMap<String, Employee>, AppError> {
    Ok(state
        .repo
        .list_employees()
        .await?
        .into_iter()
        .map(|e| (e.id.clone(), e))
        .collect())
}

/// GET /api/attendance - Attendance records visible to the acting user.
pub async fn list_attendance(
    State(state): State<AppState>,
    Actor(viewer): Actor,
) -> ApiResult<Vec<AttendanceRecord>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let employees = employee_index(&state).await?;
        Ok::<_, AppError>(
            state
                .repo
                .list_attendance()
                .await?
                .into_iter()
                .filter(|r| owner_visible(&viewer, &r.employee_id, &employees))
                .collect(),
        )
    }
    .await;
    respond(&state, revision_id, result).await
}

/// POST /api/attendance/check-in - Start the acting user's working day.
pub async fn check_in(
    State(state): State<AppState>,
    Actor(viewer): Actor,
) -> ApiResult<AttendanceRecord> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let now = Local::now();
        let record = AttendanceRecord {
            id: uuid::Uuid::new_v4().to_string(),
            employee_id: viewer.id.clone(),
            date: now.date_naive(),
            check_in: now.format("%H:%M").to_string(),
            check_out: None,
            status: AttendanceStatus::for_check_in(now.time(), state.config.late_after),
        };

        state.repo.insert_attendance(&record).await?;
        log_activity(&state, &viewer, "checked in", &record.check_in).await;
        Ok::<_, AppError>(record)
    }
    .await;
    respond(&state, revision_id, result).await
}

/// POST /api/attendance/check-out - End the acting user's working day.
pub async fn check_out(
    State(state): State<AppState>,
    Actor(viewer): Actor,
) -> ApiResult<AttendanceRecord> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let now = Local::now();
    let time = now.format("%H:%M").to_string();
    let result = state
        .repo
        .check_out(&viewer.id, now.date_naive(), &time)
        .await;
    if result.is_ok() {
        log_activity(&state, &viewer, "checked out", &time).await;
    }
    respond(&state, revision_id, result).await
}

/// GET /api/leave-requests - Leave requests visible to the acting user.
pub async fn list_leave_requests(
    State(state): State<AppState>,
    Actor(viewer): Actor,
) -> ApiResult<Vec<LeaveRequest>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let employees = employee_index(&state).await?;
        Ok::<_, AppError>(
            state
                .repo
                .list_leave_requests()
                .await?
                .into_iter()
                .filter(|l| owner_visible(&viewer, &l.employee_id, &employees))
                .collect(),
        )
    }
    .await;
    respond(&state, revision_id, result).await
}

/// POST /api/leave-requests - File a leave request for the acting user.
pub async fn create_leave_request(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Json(request): Json<CreateLeaveRequest>,
) -> ApiResult<LeaveRequest> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        if request.end_date < request.start_date {
            return Err(AppError::Validation(
                "Leave end date is before its start date".to_string(),
            ));
        }

        let leave = LeaveRequest {
            id: uuid::Uuid::new_v4().to_string(),
            employee_id: viewer.id.clone(),
            leave_type: request.leave_type,
            start_date: request.start_date,
            end_date: request.end_date,
            reason: request.reason.trim().to_string(),
            status: LeaveStatus::Pending,
            created_at: now_rfc3339(),
            attachment_url: request.attachment_url.clone(),
            decided_by: None,
        };

        state.repo.insert_leave_request(&leave).await?;
        log_activity(
            &state,
            &viewer,
            &format!("requested {} leave", leave.leave_type),
            &leave.start_date.to_string(),
        )
        .await;
        Ok::<_, AppError>(leave)
    }
    .await;
    respond(&state, revision_id, result).await
}

/// PUT /api/leave-requests/{id}/decision - Approve or reject a leave request.
pub async fn decide_leave_request(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Path(id): Path<String>,
    Json(request): Json<LeaveDecisionRequest>,
) -> ApiResult<LeaveRequest> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        viewer.require(Permission::DecideLeave)?;
        if request.status == LeaveStatus::Pending {
            return Err(AppError::Validation(
                "A decision must be APPROVED or REJECTED".to_string(),
            ));
        }

        let leave = state
            .repo
            .get_leave_request(&id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Leave request {} not found", id)))?;
        let employees = employee_index(&state).await?;
        if !owner_visible(&viewer, &leave.employee_id, &employees) {
            return Err(AppError::NotFound(format!("Leave request {} not found", id)));
        }

        let leave = state
            .repo
            .decide_leave_request(&id, request.status, &viewer.id)
            .await?;
        log_activity(
            &state,
            &viewer,
            &format!("marked leave {}", leave.status),
            &leave.employee_id,
        )
        .await;
        Ok::<_, AppError>(leave)
    }
    .await;
    respond(&state, revision_id, result).await
}
