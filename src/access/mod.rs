//! Role-based visibility and permissions.
//!
//! ADMIN sees the whole firm. Every other role sees only records of its own
//! department, optionally narrowed to records it personally owns.

use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{Employee, Project, Role, Task};

/// The employee on whose behalf a request runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewer {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub department_id: String,
}

impl From<&Employee> for Viewer {
    fn from(employee: &Employee) -> Self {
        Self {
            id: employee.id.clone(),
            name: employee.name.clone(),
            role: employee.role,
            department_id: employee.department_id.clone(),
        }
    }
}

/// Which slice of the visible pool to return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewScope {
    /// Everything the role may see
    #[default]
    Department,
    /// Only records owned by the viewer
    Personal,
}

/// A record that belongs to a department and, optionally, to one employee.
pub trait Scoped {
    fn department_id(&self) -> &str;

    /// Whether `employee_id` owns this record for the personal view.
    fn is_owned_by(&self, employee_id: &str) -> bool;
}

impl Scoped for Task {
    fn department_id(&self) -> &str {
        &self.department_id
    }

    fn is_owned_by(&self, employee_id: &str) -> bool {
        self.assigned_to == employee_id
    }
}

impl Scoped for Project {
    fn department_id(&self) -> &str {
        &self.department_id
    }

    fn is_owned_by(&self, employee_id: &str) -> bool {
        self.manager_id == employee_id
    }
}

impl Scoped for Employee {
    fn department_id(&self) -> &str {
        &self.department_id
    }

    fn is_owned_by(&self, employee_id: &str) -> bool {
        self.id == employee_id
    }
}

impl Viewer {
    /// Whether a record of `department_id` is inside this viewer's pool.
    pub fn sees_department(&self, department_id: &str) -> bool {
        self.role.is_admin() || self.department_id == department_id
    }

    pub fn can_see<T: Scoped>(&self, item: &T) -> bool {
        self.sees_department(item.department_id())
    }

    fn in_scope<T: Scoped>(&self, item: &T, scope: ViewScope) -> bool {
        self.can_see(item)
            && match scope {
                ViewScope::Department => true,
                ViewScope::Personal => item.is_owned_by(&self.id),
            }
    }

    /// Filter `items` down to what this viewer may see, keeping input order.
    pub fn filter_visible<T: Scoped + Clone>(&self, items: &[T], scope: ViewScope) -> Vec<T> {
        items
            .iter()
            .filter(|item| self.in_scope(*item, scope))
            .cloned()
            .collect()
    }

    /// Owning variant of [`Viewer::filter_visible`].
    pub fn retain_visible<T: Scoped>(&self, items: Vec<T>, scope: ViewScope) -> Vec<T> {
        items
            .into_iter()
            .filter(|item| self.in_scope(item, scope))
            .collect()
    }

    /// Fail with `Forbidden` unless this viewer holds `permission`.
    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if permission.allows(self.role) {
            Ok(())
        } else {
            tracing::debug!(
                viewer = %self.id,
                role = %self.role,
                ?permission,
                "permission denied"
            );
            Err(AppError::Forbidden(format!(
                "Role {} is not allowed to {}",
                self.role,
                permission.describe()
            )))
        }
    }

    /// Fail with `NotFound` when the record is outside the viewer's pool.
    ///
    /// Hidden records are reported as missing rather than forbidden.
    pub fn require_visible<T: Scoped>(&self, item: &T, what: &str, id: &str) -> Result<(), AppError> {
        if self.can_see(item) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("{} {} not found", what, id)))
        }
    }
}

/// Role-gated actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Create tasks, edit task details, delete tasks
    EditTasks,
    /// Create projects, add steps, edit project fields
    ManageProjects,
    /// Plan, activate, close and delete sprints
    ManageSprints,
    /// Approve registrations and change roles
    ManageEmployees,
    /// Define and delete KPI rules
    ManageKpiRules,
    ViewAnalytics,
    ViewActivity,
    ViewDepartments,
    DecideLeave,
}

impl Permission {
    pub fn allows(&self, role: Role) -> bool {
        match self {
            Permission::EditTasks
            | Permission::ManageSprints
            | Permission::ManageEmployees
            | Permission::ViewActivity
            | Permission::ViewDepartments
            | Permission::DecideLeave => role.is_manager(),
            Permission::ManageProjects | Permission::ManageKpiRules => role.is_admin(),
            Permission::ViewAnalytics => role != Role::Employee,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Permission::EditTasks => "create or edit tasks",
            Permission::ManageProjects => "manage projects",
            Permission::ManageSprints => "manage sprints",
            Permission::ManageEmployees => "manage employees",
            Permission::ManageKpiRules => "manage KPI rules",
            Permission::ViewAnalytics => "view KPI analytics",
            Permission::ViewActivity => "view the activity log",
            Permission::ViewDepartments => "view the departments overview",
            Permission::DecideLeave => "decide leave requests",
        }
    }
}

/// Whether `viewer` may toggle the steps of `project`.
pub fn can_toggle_steps(viewer: &Viewer, project: &Project) -> bool {
    viewer.role.is_admin() || viewer.id == project.manager_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_task;

    fn viewer(role: Role, department: &str) -> Viewer {
        Viewer {
            id: "emp-7".to_string(),
            name: "Eng. Omar".to_string(),
            role,
            department_id: department.to_string(),
        }
    }

    fn tasks() -> Vec<Task> {
        vec![
            sample_task("t1", "arch", "emp-7"),
            sample_task("t2", "struct", "emp-7"),
            sample_task("t3", "arch", "emp-9"),
            sample_task("t4", "hr", "emp-3"),
            sample_task("t5", "arch", "emp-7"),
        ]
    }

    #[test]
    fn test_admin_sees_everything() {
        let admin = viewer(Role::Admin, "arch");
        let all = tasks();
        assert_eq!(admin.filter_visible(&all, ViewScope::Department), all);
    }

    #[test]
    fn test_non_admin_never_sees_other_departments() {
        for role in [Role::DeptManager, Role::TeamLeader, Role::Employee] {
            let v = viewer(role, "arch");
            for scope in [ViewScope::Department, ViewScope::Personal] {
                let visible = v.filter_visible(&tasks(), scope);
                assert!(visible.iter().all(|t| t.department_id == "arch"));
            }
            let ids: Vec<_> = v
                .filter_visible(&tasks(), ViewScope::Department)
                .into_iter()
                .map(|t| t.id)
                .collect();
            assert_eq!(ids, ["t1", "t3", "t5"]);
        }
    }

    #[test]
    fn test_personal_scope_keeps_own_tasks_in_department() {
        let v = viewer(Role::Employee, "arch");
        let ids: Vec<_> = v
            .retain_visible(tasks(), ViewScope::Personal)
            .into_iter()
            .map(|t| t.id)
            .collect();
        // t2 is assigned to the viewer but sits in another department
        assert_eq!(ids, ["t1", "t5"]);
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        let v = viewer(Role::TeamLeader, "acc");
        assert!(v.filter_visible::<Task>(&[], ViewScope::Department).is_empty());
        assert!(v.filter_visible(&tasks(), ViewScope::Department).is_empty());
    }

    #[test]
    fn test_permission_table() {
        assert!(Permission::EditTasks.allows(Role::DeptManager));
        assert!(!Permission::EditTasks.allows(Role::TeamLeader));
        assert!(Permission::ManageProjects.allows(Role::Admin));
        assert!(!Permission::ManageProjects.allows(Role::DeptManager));
        assert!(Permission::ViewAnalytics.allows(Role::TeamLeader));
        assert!(!Permission::ViewAnalytics.allows(Role::Employee));
        assert!(!Permission::ViewActivity.allows(Role::TeamLeader));

        let err = viewer(Role::Employee, "arch")
            .require(Permission::ManageKpiRules)
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
