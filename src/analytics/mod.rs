//! KPI aggregation, project progress and dashboard statistics.
//!
//! Everything here is recomputed from the input slices on each call.

use std::collections::HashMap;

use serde::Serialize;

use crate::access::Viewer;
use crate::models::{Department, Employee, Task, TaskStatus};

/// Tasks shown in the dashboard's "recent" list.
const RECENT_TASK_COUNT: usize = 5;

/// Project task weights are expected to add up to this.
pub const FULL_WEIGHT: i64 = 100;

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Mean KPI of `employees`, one decimal, 0 for an empty list.
pub fn average_kpi(employees: &[Employee]) -> f64 {
    average_of(employees.iter())
}

fn average_of<'a>(employees: impl Iterator<Item = &'a Employee>) -> f64 {
    let (sum, count) = employees.fold((0.0, 0usize), |(sum, count), e| (sum + e.kpi, count + 1));
    if count == 0 {
        0.0
    } else {
        round1(sum / count as f64)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentKpi {
    pub department_id: String,
    pub name: String,
    pub employee_count: usize,
    pub average_kpi: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kpi_target: Option<f64>,
}

/// One entry per department, in department order.
pub fn department_kpis(departments: &[Department], employees: &[Employee]) -> Vec<DepartmentKpi> {
    let mut grouped: HashMap<&str, Vec<&Employee>> = HashMap::new();
    for employee in employees {
        grouped
            .entry(employee.department_id.as_str())
            .or_default()
            .push(employee);
    }

    departments
        .iter()
        .map(|dept| {
            let members = grouped.get(dept.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            DepartmentKpi {
                department_id: dept.id.clone(),
                name: dept.name.clone(),
                employee_count: members.len(),
                average_kpi: average_of(members.iter().copied()),
                kpi_target: dept.kpi_target,
            }
        })
        .collect()
}

/// Highest KPI; the earlier employee wins a tie.
pub fn top_employee(employees: &[Employee]) -> Option<&Employee> {
    employees
        .iter()
        .fold(None, |best: Option<&Employee>, e| match best {
            Some(b) if b.kpi >= e.kpi => Some(b),
            _ => Some(e),
        })
}

/// Highest department average; the earlier department wins a tie.
pub fn top_department(kpis: &[DepartmentKpi]) -> Option<&DepartmentKpi> {
    kpis.iter().fold(None, |best: Option<&DepartmentKpi>, d| match best {
        Some(b) if b.average_kpi >= d.average_kpi => Some(b),
        _ => Some(d),
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeKpi {
    pub employee_id: String,
    pub name: String,
    pub department_id: String,
    pub kpi: f64,
}

impl From<&Employee> for EmployeeKpi {
    fn from(e: &Employee) -> Self {
        Self {
            employee_id: e.id.clone(),
            name: e.name.clone(),
            department_id: e.department_id.clone(),
            kpi: e.kpi,
        }
    }
}

/// The KPI analytics page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiReport {
    pub average_kpi: f64,
    pub employee_count: usize,
    pub departments: Vec<DepartmentKpi>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_employee: Option<EmployeeKpi>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_department: Option<DepartmentKpi>,
    /// Employees ordered by KPI, best first
    pub ranking: Vec<EmployeeKpi>,
}

pub fn kpi_report(departments: &[Department], employees: &[Employee]) -> KpiReport {
    let dept_kpis = department_kpis(departments, employees);

    let mut ranking: Vec<EmployeeKpi> = employees.iter().map(EmployeeKpi::from).collect();
    ranking.sort_by(|a, b| b.kpi.total_cmp(&a.kpi));

    KpiReport {
        average_kpi: average_kpi(employees),
        employee_count: employees.len(),
        top_employee: top_employee(employees).map(EmployeeKpi::from),
        top_department: top_department(&dept_kpis).cloned(),
        departments: dept_kpis,
        ranking,
    }
}

/// Weighted completion of a project's tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectProgress {
    pub progress: u8,
    pub weight_total: i64,
    pub weight_warning: bool,
    pub task_count: usize,
}

/// round(completed weight / total weight * 100); 0 when there is no weight.
pub fn project_progress<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> ProjectProgress {
    let mut total = 0i64;
    let mut completed = 0i64;
    let mut count = 0usize;
    for task in tasks {
        let weight = task.weight.max(0);
        total = total.saturating_add(weight);
        if task.status == TaskStatus::Completed {
            completed = completed.saturating_add(weight);
        }
        count += 1;
    }

    let progress = if total == 0 {
        0
    } else {
        ((completed as f64 / total as f64) * 100.0).round() as u8
    };

    ProjectProgress {
        progress,
        weight_total: total,
        weight_warning: count > 0 && total != FULL_WEIGHT,
        task_count: count,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: TaskStatus,
    pub count: usize,
}

/// Task count per status, in board column order.
pub fn status_counts(tasks: &[Task]) -> Vec<StatusCount> {
    TaskStatus::ALL
        .iter()
        .map(|&status| StatusCount {
            status,
            count: tasks.iter().filter(|t| t.status == status).count(),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentLoad {
    pub department_id: String,
    pub name: String,
    pub tasks: usize,
    pub employees: usize,
}

/// Figures for the landing dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_tasks: usize,
    pub open_tasks: usize,
    pub status_counts: Vec<StatusCount>,
    pub average_kpi: f64,
    pub active_employees: usize,
    pub departments: Vec<DepartmentLoad>,
    pub recent_tasks: Vec<Task>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_employee: Option<EmployeeKpi>,
}

/// `tasks` must be ordered newest first.
pub fn dashboard(tasks: &[Task], employees: &[Employee], departments: &[Department]) -> DashboardStats {
    let departments = departments
        .iter()
        .map(|d| DepartmentLoad {
            department_id: d.id.clone(),
            name: d.name.clone(),
            tasks: tasks.iter().filter(|t| t.department_id == d.id).count(),
            employees: employees.iter().filter(|e| e.department_id == d.id).count(),
        })
        .collect();

    DashboardStats {
        total_tasks: tasks.len(),
        open_tasks: tasks.iter().filter(|t| t.status.is_open()).count(),
        status_counts: status_counts(tasks),
        average_kpi: average_kpi(employees),
        active_employees: employees.len(),
        departments,
        recent_tasks: tasks.iter().take(RECENT_TASK_COUNT).cloned().collect(),
        top_employee: top_employee(employees).map(EmployeeKpi::from),
    }
}

/// Whether `employee`'s profile reads as archived to `viewer`.
///
/// Managers and the employee themself always see a live profile. Anyone
/// else sees an archive once the employee has tasks and none is open.
pub fn is_archived(viewer: &Viewer, employee: &Employee, tasks: &[Task]) -> bool {
    if viewer.role.is_manager() || viewer.id == employee.id {
        return false;
    }
    let mut own = tasks.iter().filter(|t| t.assigned_to == employee.id).peekable();
    own.peek().is_some() && own.all(|t| !t.status.is_open())
}
