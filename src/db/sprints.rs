//! Sprint persistence. Extensions live in their own append-only table.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::repository::{concurrent_modification, enum_column};
use super::Repository;
use crate::errors::AppError;
use crate::models::{Sprint, SprintExtension, SprintStatus};

const SPRINT_COLUMNS: &str =
    "id, name, start_date, end_date, status, project_id, created_at, updated_at, version";

impl Repository {
    /// List all sprints with their extension ledgers.
    pub async fn list_sprints(&self) -> Result<Vec<Sprint>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM sprints ORDER BY start_date, rowid",
            SPRINT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        let mut sprints = rows
            .iter()
            .map(sprint_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let ext_rows = sqlx::query(
            "SELECT id, sprint_id, old_end_date, new_end_date, reason, extended_at, extended_by FROM sprint_extensions ORDER BY sprint_id, seq",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut ledgers: HashMap<String, Vec<SprintExtension>> = HashMap::new();
        for row in &ext_rows {
            ledgers
                .entry(row.get("sprint_id"))
                .or_default()
                .push(extension_from_row(row)?);
        }
        for sprint in &mut sprints {
            if let Some(ledger) = ledgers.remove(&sprint.id) {
                sprint.extensions = ledger;
            }
        }

        Ok(sprints)
    }

    pub async fn get_sprint(&self, id: &str) -> Result<Option<Sprint>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM sprints WHERE id = ?",
            SPRINT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut sprint = sprint_from_row(&row)?;

        let ext_rows = sqlx::query(
            "SELECT id, sprint_id, old_end_date, new_end_date, reason, extended_at, extended_by FROM sprint_extensions WHERE sprint_id = ? ORDER BY seq",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        sprint.extensions = ext_rows
            .iter()
            .map(extension_from_row)
            .collect::<Result<_, _>>()?;

        Ok(Some(sprint))
    }

    /// Insert a new sprint with whatever extensions it already carries.
    pub async fn insert_sprint(&self, sprint: &Sprint) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO sprints (id, name, start_date, end_date, status, project_id, created_at, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&sprint.id)
        .bind(&sprint.name)
        .bind(sprint.start_date)
        .bind(sprint.end_date)
        .bind(sprint.status.as_str())
        .bind(&sprint.project_id)
        .bind(&sprint.created_at)
        .bind(&sprint.updated_at)
        .bind(sprint.version)
        .execute(&mut *tx)
        .await?;

        for (seq, extension) in sprint.extensions.iter().enumerate() {
            insert_extension(&mut tx, &sprint.id, seq as i64, extension).await?;
        }

        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Persist a lifecycle change or extension of `sprint`.
    ///
    /// `sprint.version` is the version it was read at. Extensions beyond the
    /// stored ledger length are appended; stored ones are never rewritten.
    pub async fn update_sprint(&self, sprint: &Sprint) -> Result<Sprint, AppError> {
        let now = Utc::now().to_rfc3339();
        let new_version = sprint.version + 1;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE sprints SET name = ?, start_date = ?, end_date = ?, status = ?, updated_at = ?, version = ? WHERE id = ? AND version = ?",
        )
        .bind(&sprint.name)
        .bind(sprint.start_date)
        .bind(sprint.end_date)
        .bind(sprint.status.as_str())
        .bind(&now)
        .bind(new_version)
        .bind(&sprint.id)
        .bind(sprint.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(match self.get_sprint(&sprint.id).await? {
                Some(current) => concurrent_modification(current.version),
                None => AppError::NotFound(format!("Sprint {} not found", sprint.id)),
            });
        }

        let stored: i64 =
            sqlx::query("SELECT COUNT(*) AS n FROM sprint_extensions WHERE sprint_id = ?")
                .bind(&sprint.id)
                .fetch_one(&mut *tx)
                .await?
                .get("n");
        for (seq, extension) in sprint.extensions.iter().enumerate().skip(stored as usize) {
            insert_extension(&mut tx, &sprint.id, seq as i64, extension).await?;
        }

        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Sprint {
            updated_at: now,
            version: new_version,
            ..sprint.clone()
        })
    }

    /// Delete a sprint and its extension ledger.
    pub async fn delete_sprint(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM sprints WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!("Sprint {} not found", id)));
        }

        sqlx::query("DELETE FROM sprint_extensions WHERE sprint_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

async fn insert_extension(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    sprint_id: &str,
    seq: i64,
    extension: &SprintExtension,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO sprint_extensions (id, sprint_id, seq, old_end_date, new_end_date, reason, extended_at, extended_by) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&extension.id)
    .bind(sprint_id)
    .bind(seq)
    .bind(extension.old_end_date)
    .bind(extension.new_end_date)
    .bind(&extension.reason)
    .bind(&extension.extended_at)
    .bind(&extension.extended_by)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn sprint_from_row(row: &SqliteRow) -> Result<Sprint, AppError> {
    Ok(Sprint {
        id: row.get("id"),
        name: row.get("name"),
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        status: enum_column(row, "status", SprintStatus::parse)?,
        project_id: row.get("project_id"),
        extensions: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    })
}

fn extension_from_row(row: &SqliteRow) -> Result<SprintExtension, AppError> {
    Ok(SprintExtension {
        id: row.get("id"),
        old_end_date: row.try_get("old_end_date")?,
        new_end_date: row.try_get("new_end_date")?,
        reason: row.get("reason"),
        extended_at: row.get("extended_at"),
        extended_by: row.get("extended_by"),
    })
}
