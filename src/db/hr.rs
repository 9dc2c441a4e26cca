//! Attendance and leave persistence.

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::repository::enum_column;
use super::Repository;
use crate::errors::AppError;
use crate::models::{AttendanceRecord, AttendanceStatus, LeaveRequest, LeaveStatus, LeaveType};

impl Repository {
    /// Attendance records, newest day first.
    pub async fn list_attendance(&self) -> Result<Vec<AttendanceRecord>, AppError> {
        let rows = sqlx::query(
            "SELECT id, employee_id, date, check_in, check_out, status FROM attendance ORDER BY date DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(attendance_from_row).collect()
    }

    pub async fn get_attendance(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let row = sqlx::query(
            "SELECT id, employee_id, date, check_in, check_out, status FROM attendance WHERE employee_id = ? AND date = ?",
        )
        .bind(employee_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(attendance_from_row).transpose()
    }

    /// Record a check-in. Fails with `InvalidTransition` if one already exists for that day.
    pub async fn insert_attendance(&self, record: &AttendanceRecord) -> Result<(), AppError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO attendance (id, employee_id, date, check_in, check_out, status) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.employee_id)
        .bind(record.date)
        .bind(&record.check_in)
        .bind(&record.check_out)
        .bind(record.status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InvalidTransition(format!(
                "Already checked in on {}",
                record.date
            )));
        }

        self.increment_revision().await?;
        Ok(())
    }

    /// Set the check-out time of an open attendance record.
    pub async fn check_out(
        &self,
        employee_id: &str,
        date: NaiveDate,
        time: &str,
    ) -> Result<AttendanceRecord, AppError> {
        let result = sqlx::query(
            "UPDATE attendance SET check_out = ? WHERE employee_id = ? AND date = ? AND check_out IS NULL",
        )
        .bind(time)
        .bind(employee_id)
        .bind(date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(match self.get_attendance(employee_id, date).await? {
                Some(_) => AppError::InvalidTransition(format!("Already checked out on {}", date)),
                None => AppError::Validation(format!("No check-in recorded on {}", date)),
            });
        }

        self.increment_revision().await?;
        self.get_attendance(employee_id, date)
            .await?
            .ok_or_else(|| AppError::Internal("Attendance record vanished".to_string()))
    }

    /// Leave requests, newest first.
    pub async fn list_leave_requests(&self) -> Result<Vec<LeaveRequest>, AppError> {
        let rows = sqlx::query(
            "SELECT id, employee_id, leave_type, start_date, end_date, reason, status, created_at, attachment_url, decided_by FROM leave_requests ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(leave_from_row).collect()
    }

    pub async fn get_leave_request(&self, id: &str) -> Result<Option<LeaveRequest>, AppError> {
        let row = sqlx::query(
            "SELECT id, employee_id, leave_type, start_date, end_date, reason, status, created_at, attachment_url, decided_by FROM leave_requests WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(leave_from_row).transpose()
    }

    pub async fn insert_leave_request(&self, leave: &LeaveRequest) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO leave_requests (id, employee_id, leave_type, start_date, end_date, reason, status, created_at, attachment_url, decided_by) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&leave.id)
        .bind(&leave.employee_id)
        .bind(leave.leave_type.as_str())
        .bind(leave.start_date)
        .bind(leave.end_date)
        .bind(&leave.reason)
        .bind(leave.status.as_str())
        .bind(&leave.created_at)
        .bind(&leave.attachment_url)
        .bind(&leave.decided_by)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;
        Ok(())
    }

    /// Record the decision on a pending leave request.
    pub async fn decide_leave_request(
        &self,
        id: &str,
        status: LeaveStatus,
        decided_by: &str,
    ) -> Result<LeaveRequest, AppError> {
        let result = sqlx::query(
            "UPDATE leave_requests SET status = ?, decided_by = ? WHERE id = ? AND status = ?",
        )
        .bind(status.as_str())
        .bind(decided_by)
        .bind(id)
        .bind(LeaveStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(match self.get_leave_request(id).await? {
                Some(existing) => AppError::InvalidTransition(format!(
                    "Leave request {} was already {}",
                    id, existing.status
                )),
                None => AppError::NotFound(format!("Leave request {} not found", id)),
            });
        }

        self.increment_revision().await?;
        self.get_leave_request(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Leave request {} not found", id)))
    }
}

fn attendance_from_row(row: &SqliteRow) -> Result<AttendanceRecord, AppError> {
    Ok(AttendanceRecord {
        id: row.get("id"),
        employee_id: row.get("employee_id"),
        date: row.try_get("date")?,
        check_in: row.get("check_in"),
        check_out: row.get("check_out"),
        status: enum_column(row, "status", AttendanceStatus::parse)?,
    })
}

fn leave_from_row(row: &SqliteRow) -> Result<LeaveRequest, AppError> {
    Ok(LeaveRequest {
        id: row.get("id"),
        employee_id: row.get("employee_id"),
        leave_type: enum_column(row, "leave_type", LeaveType::parse)?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        reason: row.get("reason"),
        status: enum_column(row, "status", LeaveStatus::parse)?,
        created_at: row.get("created_at"),
        attachment_url: row.get("attachment_url"),
        decided_by: row.get("decided_by"),
    })
}
