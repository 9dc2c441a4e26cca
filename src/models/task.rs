//! Task model: the cards on the kanban board and the steps of a project.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

wire_enum! {
    /// Kanban column of a task. Any status may be set from any other.
    pub enum TaskStatus {
        New => "NEW",
        InProgress => "IN_PROGRESS",
        Review => "REVIEW",
        Pending => "PENDING",
        Completed => "COMPLETED",
    }
}

impl TaskStatus {
    pub fn is_open(&self) -> bool {
        *self != TaskStatus::Completed
    }
}

wire_enum! {
    pub enum TaskPriority {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

/// A comment left on a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author_id: String,
    pub text: String,
    pub created_at: String,
}

/// File metadata attached to a task. The file itself lives wherever `url` points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub uploaded_at: String,
}

/// A unit of work assigned to one employee.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: String,
    pub department_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub due_date: NaiveDate,
    pub estimated_hours: f64,
    pub actual_hours: f64,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub kpi_points: i64,
    /// Percentage contribution to the parent project's progress
    pub weight: i64,
    pub created_at: String,
    pub updated_at: String,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

impl Task {
    /// Drop the task into another kanban column.
    ///
    /// Only `status` changes; there is no transition table.
    pub fn move_to(&mut self, status: TaskStatus) {
        self.status = status;
    }

    /// Flip a project step between done and in progress.
    pub fn toggle_completion(&mut self) {
        self.status = if self.status == TaskStatus::Completed {
            TaskStatus::InProgress
        } else {
            TaskStatus::Completed
        };
    }

    pub fn belongs_to_project(&self, project_id: &str) -> bool {
        self.project_id.as_deref() == Some(project_id)
    }
}

/// Attachment metadata supplied when creating a task or attaching a file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttachment {
    pub name: String,
    pub url: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Request body for creating a single task.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub assigned_to: String,
    /// Defaults to the assignee's department
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub kpi_points: Option<i64>,
    #[serde(default)]
    pub weight: Option<i64>,
    /// KPI rule used to pre-fill title, points and hours
    #[serde(default)]
    pub kpi_rule_id: Option<String>,
    #[serde(default)]
    pub attachments: Vec<NewAttachment>,
}

/// One row of a bulk assignment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkTaskItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub kpi_points: Option<i64>,
}

/// Request body for assigning several tasks to one employee at once.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCreateTasksRequest {
    pub assigned_to: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub attachments: Vec<NewAttachment>,
    pub items: Vec<BulkTaskItem>,
}

/// Request body for editing task details.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub actual_hours: Option<f64>,
    #[serde(default)]
    pub kpi_points: Option<i64>,
    #[serde(default)]
    pub weight: Option<i64>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

impl UpdateTaskRequest {
    /// Apply every supplied field to `task`.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(assigned_to) = &self.assigned_to {
            task.assigned_to = assigned_to.clone();
        }
        if let Some(project_id) = &self.project_id {
            task.project_id = Some(project_id.clone()).filter(|p| !p.is_empty());
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(hours) = self.estimated_hours {
            task.estimated_hours = hours;
        }
        if let Some(hours) = self.actual_hours {
            task.actual_hours = hours;
        }
        if let Some(points) = self.kpi_points {
            task.kpi_points = points;
        }
        if let Some(weight) = self.weight {
            task.weight = weight;
        }
    }
}

/// Request body for a kanban drag-and-drop.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveTaskRequest {
    pub status: TaskStatus,
}

/// Request body for a new comment.
#[derive(Debug, Clone, Deserialize)]
pub struct AddCommentRequest {
    pub text: String,
}

#[cfg(test)]
pub(crate) fn sample_task(id: &str, department_id: &str, assigned_to: &str) -> Task {
    Task {
        id: id.to_string(),
        title: format!("Task {}", id),
        description: "Review the structural drawings".to_string(),
        status: TaskStatus::New,
        priority: TaskPriority::High,
        assigned_to: assigned_to.to_string(),
        department_id: department_id.to_string(),
        project_id: Some("proj-1".to_string()),
        due_date: NaiveDate::from_ymd_opt(2024, 5, 30).unwrap(),
        estimated_hours: 20.0,
        actual_hours: 5.0,
        comments: vec![Comment {
            id: "c-1".to_string(),
            author_id: "emp-1".to_string(),
            text: "Check the facade".to_string(),
            created_at: "2024-05-02T08:00:00+00:00".to_string(),
        }],
        attachments: Vec::new(),
        kpi_points: 50,
        weight: 20,
        created_at: "2024-05-01T08:00:00+00:00".to_string(),
        updated_at: "2024-05-01T08:00:00+00:00".to_string(),
        version: 3,
    }
}
