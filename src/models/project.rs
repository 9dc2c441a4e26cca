//! Project portfolio model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

wire_enum! {
    pub enum ProjectStatus {
        Active => "ACTIVE",
        OnHold => "ON_HOLD",
        Completed => "COMPLETED",
    }
}

/// A client engagement owned by one department.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub client: String,
    pub budget: f64,
    pub status: ProjectStatus,
    pub deadline: NaiveDate,
    pub manager_id: String,
    pub department_id: String,
    pub created_at: String,
    pub updated_at: String,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

/// A project together with the progress derived from its tasks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Project,
    /// Completed share of task weight, 0 to 100
    pub progress: u8,
    pub weight_total: i64,
    /// Set when the task weights do not add up to 100
    pub weight_warning: bool,
    pub task_count: usize,
}

/// An initial step supplied when launching a project.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStep {
    pub title: String,
    #[serde(default = "default_step_weight")]
    pub weight: i64,
}

pub(crate) fn default_step_weight() -> i64 {
    10
}

/// Request body for launching a new project.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub budget: f64,
    pub deadline: NaiveDate,
    pub manager_id: String,
    /// Defaults to the manager's department
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub steps: Vec<ProjectStep>,
}

/// Request body for editing a project.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub manager_id: Option<String>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

impl UpdateProjectRequest {
    pub fn apply_to(&self, project: &mut Project) {
        if let Some(name) = &self.name {
            project.name = name.clone();
        }
        if let Some(client) = &self.client {
            project.client = client.clone();
        }
        if let Some(budget) = self.budget {
            project.budget = budget;
        }
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(deadline) = self.deadline {
            project.deadline = deadline;
        }
        if let Some(manager_id) = &self.manager_id {
            project.manager_id = manager_id.clone();
        }
    }
}
