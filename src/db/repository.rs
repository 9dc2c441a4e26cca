//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity. The
//! per-entity operations live in sibling modules as further `impl Repository`
//! blocks; this module holds the pool, the revision counter and the row
//! helpers they share.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{Activity, RevisionInfo};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row =
            sqlx::query("SELECT schema_version, revision_id, generated_at FROM meta WHERE id = 1")
                .fetch_one(&self.pool)
                .await?;
        Ok(RevisionInfo {
            schema_version: row.get("schema_version"),
            revision_id: row.get("revision_id"),
            generated_at: row.get("generated_at"),
        })
    }

    /// Increment the revision ID and return the new value.
    pub async fn increment_revision(&self) -> Result<i64, AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&self.pool)
            .await?;
        self.get_revision_id().await
    }

    // ==================== ACTIVITY LOG ====================

    /// Append an entry to the activity log.
    pub async fn record_activity(
        &self,
        user_id: &str,
        action: &str,
        target: &str,
    ) -> Result<Activity, AppError> {
        let activity = Activity {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            action: action.to_string(),
            target: target.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        };

        sqlx::query(
            "INSERT INTO activities (id, user_id, action, target, timestamp) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&activity.id)
        .bind(&activity.user_id)
        .bind(&activity.action)
        .bind(&activity.target)
        .bind(&activity.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(activity)
    }

    /// Most recent activity entries, newest first.
    pub async fn list_activities(&self, limit: i64) -> Result<Vec<Activity>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, action, target, timestamp FROM activities ORDER BY timestamp DESC, rowid DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Activity {
                id: row.get("id"),
                user_id: row.get("user_id"),
                action: row.get("action"),
                target: row.get("target"),
                timestamp: row.get("timestamp"),
            })
            .collect())
    }
}

/// Fail with `Conflict` when the caller's expected version is stale.
pub fn check_version(expected: Option<i64>, current: i64) -> Result<(), AppError> {
    match expected {
        Some(expected) if expected != current => Err(AppError::Conflict {
            message: format!(
                "Version mismatch: expected {}, current {}",
                expected, current
            ),
            current_version: current,
        }),
        _ => Ok(()),
    }
}

/// Error for a conditional UPDATE that matched no row.
pub(super) fn concurrent_modification(current_version: i64) -> AppError {
    AppError::Conflict {
        message: "Concurrent modification detected".to_string(),
        current_version,
    }
}

/// Decode a wire-enum column.
pub(super) fn enum_column<T>(
    row: &SqliteRow,
    column: &str,
    parse: fn(&str) -> Option<T>,
) -> Result<T, AppError> {
    let raw: String = row.try_get(column)?;
    parse(&raw).ok_or_else(|| {
        AppError::Database(format!("Unexpected value {:?} in column {}", raw, column))
    })
}

/// Decode a JSON array column, treating malformed content as empty.
pub(super) fn json_column<T: serde::de::DeserializeOwned>(row: &SqliteRow, column: &str) -> Vec<T> {
    let raw: String = row.get(column);
    serde_json::from_str(&raw).unwrap_or_default()
}
