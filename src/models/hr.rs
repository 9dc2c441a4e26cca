//! Attendance and leave records.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

wire_enum! {
    pub enum AttendanceStatus {
        Present => "PRESENT",
        Absent => "ABSENT",
        Late => "LATE",
        OnLeave => "ON_LEAVE",
    }
}

impl AttendanceStatus {
    /// Status of a check-in at `time` given the configured cut-off.
    pub fn for_check_in(time: NaiveTime, late_after: NaiveTime) -> Self {
        if time > late_after {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        }
    }
}

/// One employee's attendance on one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub employee_id: String,
    pub date: NaiveDate,
    /// `HH:MM`
    pub check_in: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out: Option<String>,
    pub status: AttendanceStatus,
}

wire_enum! {
    pub enum LeaveType {
        Annual => "ANNUAL",
        Sick => "SICK",
        Emergency => "EMERGENCY",
    }
}

wire_enum! {
    pub enum LeaveStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

/// A request for time off.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub id: String,
    pub employee_id: String,
    #[serde(rename = "type")]
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
}

/// Request body for filing a leave request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeaveRequest {
    #[serde(rename = "type")]
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub attachment_url: Option<String>,
}

/// Request body for approving or rejecting a leave request.
#[derive(Debug, Clone, Deserialize)]
pub struct LeaveDecisionRequest {
    pub status: LeaveStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_in_status() {
        let cutoff = NaiveTime::from_hms_opt(9, 15, 0).unwrap();
        assert_eq!(
            AttendanceStatus::for_check_in(NaiveTime::from_hms_opt(8, 55, 0).unwrap(), cutoff),
            AttendanceStatus::Present
        );
        assert_eq!(
            AttendanceStatus::for_check_in(cutoff, cutoff),
            AttendanceStatus::Present
        );
        assert_eq!(
            AttendanceStatus::for_check_in(NaiveTime::from_hms_opt(9, 40, 0).unwrap(), cutoff),
            AttendanceStatus::Late
        );
    }

    #[test]
    fn test_leave_request_type_field() {
        let request: CreateLeaveRequest = serde_json::from_value(serde_json::json!({
            "type": "SICK",
            "startDate": "2024-06-02",
            "endDate": "2024-06-03"
        }))
        .unwrap();
        assert_eq!(request.leave_type, LeaveType::Sick);
        assert!(request.reason.is_empty());
    }
}
