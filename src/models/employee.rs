//! Employee model and role definitions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

wire_enum! {
    /// Organisational role of an employee.
    pub enum Role {
        Admin => "ADMIN",
        DeptManager => "DEPT_MANAGER",
        TeamLeader => "TEAM_LEADER",
        Employee => "EMPLOYEE",
    }
}

impl Role {
    /// General manager of the whole firm.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// ADMIN and DEPT_MANAGER may run sprints, edit tasks and approve staff.
    pub fn is_manager(&self) -> bool {
        matches!(self, Role::Admin | Role::DeptManager)
    }
}

wire_enum! {
    /// Registration state of an employee account.
    pub enum EmployeeStatus {
        Active => "ACTIVE",
        Pending => "PENDING",
    }
}

/// An employee of the firm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department_id: String,
    pub avatar: String,
    /// Performance score, 0 to 100
    pub kpi: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kpi_target: Option<f64>,
    pub joined_date: NaiveDate,
    pub status: EmployeeStatus,
    pub updated_at: String,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

impl Employee {
    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }
}

/// Request body for a self-service registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterEmployeeRequest {
    pub name: String,
    pub email: String,
}

/// Request body for approving a pending registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveEmployeeRequest {
    pub role: Role,
    pub department_id: String,
}

/// Request body for changing an employee's role.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    pub role: Role,
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub kpi_target: Option<f64>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(Role::DeptManager.as_str(), "DEPT_MANAGER");
        assert_eq!(Role::parse("TEAM_LEADER"), Some(Role::TeamLeader));
        assert_eq!(Role::parse("OWNER"), None);
        assert_eq!(
            serde_json::to_value(Role::Admin).unwrap(),
            serde_json::json!("ADMIN")
        );
    }

    #[test]
    fn test_manager_roles() {
        assert!(Role::Admin.is_manager());
        assert!(Role::DeptManager.is_manager());
        assert!(!Role::TeamLeader.is_manager());
        assert!(!Role::Employee.is_manager());
        assert!(!Role::DeptManager.is_admin());
    }
}
