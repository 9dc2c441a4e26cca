//! Task persistence. Comments and attachments are stored as JSON arrays.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use super::repository::{concurrent_modification, enum_column, json_column};
use super::Repository;
use crate::errors::AppError;
use crate::models::{Task, TaskPriority, TaskStatus};

const TASK_COLUMNS: &str = "id, title, description, status, priority, assigned_to, department_id, project_id, due_date, estimated_hours, actual_hours, comments, attachments, kpi_points, weight, created_at, updated_at, version";

impl Repository {
    /// List all tasks, newest first.
    pub async fn list_tasks(&self) -> Result<Vec<Task>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tasks ORDER BY created_at DESC, rowid DESC",
            TASK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(task_from_row).collect()
    }

    /// Get a task by ID.
    pub async fn get_task(&self, id: &str) -> Result<Option<Task>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(task_from_row).transpose()
    }

    /// Insert new tasks in a single transaction with one revision bump.
    pub async fn insert_tasks(&self, tasks: &[Task]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        for task in tasks {
            insert_task_tx(&mut tx, task).await?;
        }

        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Insert a single new task.
    pub async fn insert_task(&self, task: &Task) -> Result<(), AppError> {
        self.insert_tasks(std::slice::from_ref(task)).await
    }

    /// Persist changes to `task`, whose `version` is the one it was read at.
    pub async fn update_task(&self, task: &Task) -> Result<Task, AppError> {
        let now = Utc::now().to_rfc3339();
        let new_version = task.version + 1;

        let result = sqlx::query(
            "UPDATE tasks SET title = ?, description = ?, status = ?, priority = ?, assigned_to = ?, department_id = ?, project_id = ?, due_date = ?, estimated_hours = ?, actual_hours = ?, comments = ?, attachments = ?, kpi_points = ?, weight = ?, updated_at = ?, version = ? WHERE id = ? AND version = ?",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(&task.assigned_to)
        .bind(&task.department_id)
        .bind(&task.project_id)
        .bind(task.due_date)
        .bind(task.estimated_hours)
        .bind(task.actual_hours)
        .bind(serde_json::to_string(&task.comments)?)
        .bind(serde_json::to_string(&task.attachments)?)
        .bind(task.kpi_points)
        .bind(task.weight)
        .bind(&now)
        .bind(new_version)
        .bind(&task.id)
        .bind(task.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Race condition - version changed between read and write
            return Err(match self.get_task(&task.id).await? {
                Some(current) => concurrent_modification(current.version),
                None => AppError::NotFound(format!("Task {} not found", task.id)),
            });
        }

        self.increment_revision().await?;

        Ok(Task {
            updated_at: now,
            version: new_version,
            ..task.clone()
        })
    }

    /// Delete a task.
    pub async fn delete_task(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Task {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }
}

pub(super) async fn insert_task_tx(
    tx: &mut Transaction<'_, Sqlite>,
    task: &Task,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO tasks (id, title, description, status, priority, assigned_to, department_id, project_id, due_date, estimated_hours, actual_hours, comments, attachments, kpi_points, weight, created_at, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&task.id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.status.as_str())
    .bind(task.priority.as_str())
    .bind(&task.assigned_to)
    .bind(&task.department_id)
    .bind(&task.project_id)
    .bind(task.due_date)
    .bind(task.estimated_hours)
    .bind(task.actual_hours)
    .bind(serde_json::to_string(&task.comments)?)
    .bind(serde_json::to_string(&task.attachments)?)
    .bind(task.kpi_points)
    .bind(task.weight)
    .bind(&task.created_at)
    .bind(&task.updated_at)
    .bind(task.version)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn task_from_row(row: &SqliteRow) -> Result<Task, AppError> {
    Ok(Task {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        status: enum_column(row, "status", TaskStatus::parse)?,
        priority: enum_column(row, "priority", TaskPriority::parse)?,
        assigned_to: row.get("assigned_to"),
        department_id: row.get("department_id"),
        project_id: row.get("project_id"),
        due_date: row.try_get("due_date")?,
        estimated_hours: row.get("estimated_hours"),
        actual_hours: row.get("actual_hours"),
        comments: json_column(row, "comments"),
        attachments: json_column(row, "attachments"),
        kpi_points: row.get("kpi_points"),
        weight: row.get("weight"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    })
}
