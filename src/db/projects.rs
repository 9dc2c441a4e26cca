//! Project persistence.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::repository::{concurrent_modification, enum_column};
use super::tasks::insert_task_tx;
use super::Repository;
use crate::errors::AppError;
use crate::models::{Project, ProjectStatus, Task};

const PROJECT_COLUMNS: &str =
    "id, name, client, budget, status, deadline, manager_id, department_id, created_at, updated_at, version";

impl Repository {
    pub async fn list_projects(&self) -> Result<Vec<Project>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM projects ORDER BY created_at, rowid",
            PROJECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(project_from_row).collect()
    }

    pub async fn get_project(&self, id: &str) -> Result<Option<Project>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM projects WHERE id = ?",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(project_from_row).transpose()
    }

    /// Insert a project together with its initial steps.
    pub async fn insert_project(&self, project: &Project, steps: &[Task]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO projects (id, name, client, budget, status, deadline, manager_id, department_id, created_at, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&project.id)
        .bind(&project.name)
        .bind(&project.client)
        .bind(project.budget)
        .bind(project.status.as_str())
        .bind(project.deadline)
        .bind(&project.manager_id)
        .bind(&project.department_id)
        .bind(&project.created_at)
        .bind(&project.updated_at)
        .bind(project.version)
        .execute(&mut *tx)
        .await?;

        for step in steps {
            insert_task_tx(&mut tx, step).await?;
        }

        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Persist changes to `project`, whose `version` is the one it was read at.
    pub async fn update_project(&self, project: &Project) -> Result<Project, AppError> {
        let now = Utc::now().to_rfc3339();
        let new_version = project.version + 1;

        let result = sqlx::query(
            "UPDATE projects SET name = ?, client = ?, budget = ?, status = ?, deadline = ?, manager_id = ?, department_id = ?, updated_at = ?, version = ? WHERE id = ? AND version = ?",
        )
        .bind(&project.name)
        .bind(&project.client)
        .bind(project.budget)
        .bind(project.status.as_str())
        .bind(project.deadline)
        .bind(&project.manager_id)
        .bind(&project.department_id)
        .bind(&now)
        .bind(new_version)
        .bind(&project.id)
        .bind(project.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(match self.get_project(&project.id).await? {
                Some(current) => concurrent_modification(current.version),
                None => AppError::NotFound(format!("Project {} not found", project.id)),
            });
        }

        self.increment_revision().await?;

        Ok(Project {
            updated_at: now,
            version: new_version,
            ..project.clone()
        })
    }
}

fn project_from_row(row: &SqliteRow) -> Result<Project, AppError> {
    Ok(Project {
        id: row.get("id"),
        name: row.get("name"),
        client: row.get("client"),
        budget: row.get("budget"),
        status: enum_column(row, "status", ProjectStatus::parse)?,
        deadline: row.try_get("deadline")?,
        manager_id: row.get("manager_id"),
        department_id: row.get("department_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    })
}
