//! Snapshot of everything the acting user can see.

use serde::{Deserialize, Serialize};

use super::{Department, Employee, KpiRule, ProjectView, SprintView, Task};

/// The dashboard's full working set in one response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Datastore {
    pub schema_version: i32,
    pub generated_at: String,
    pub revision_id: i64,
    pub departments: Vec<Department>,
    pub employees: Vec<Employee>,
    pub tasks: Vec<Task>,
    pub projects: Vec<ProjectView>,
    pub sprints: Vec<SprintView>,
    pub kpi_rules: Vec<KpiRule>,
}

/// Revision information for change detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub schema_version: i32,
    pub revision_id: i64,
    pub generated_at: String,
}
