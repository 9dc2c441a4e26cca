//! Departments and KPI rules.

use chrono::Utc;
use sqlx::Row;

use super::Repository;
use crate::errors::AppError;
use crate::models::{CreateKpiRuleRequest, Department, KpiRule};

impl Repository {
    /// Departments in their configured display order.
    pub async fn list_departments(&self) -> Result<Vec<Department>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, color, kpi_target FROM departments ORDER BY position, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Department {
                id: row.get("id"),
                name: row.get("name"),
                color: row.get("color"),
                kpi_target: row.get("kpi_target"),
            })
            .collect())
    }

    pub async fn department_exists(&self, id: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM departments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn insert_department(
        &self,
        department: &Department,
        position: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO departments (id, name, color, kpi_target, position) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&department.id)
        .bind(&department.name)
        .bind(&department.color)
        .bind(department.kpi_target)
        .bind(position)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_kpi_rules(&self) -> Result<Vec<KpiRule>, AppError> {
        let rows = sqlx::query(
            "SELECT id, title, category, default_points, default_hours FROM kpi_rules ORDER BY created_at, rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| KpiRule {
                id: row.get("id"),
                title: row.get("title"),
                category: row.get("category"),
                default_points: row.get("default_points"),
                default_hours: row.get("default_hours"),
            })
            .collect())
    }

    pub async fn get_kpi_rule(&self, id: &str) -> Result<Option<KpiRule>, AppError> {
        let rules = self.list_kpi_rules().await?;
        Ok(rules.into_iter().find(|r| r.id == id))
    }

    pub async fn insert_kpi_rule(&self, rule: &KpiRule) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO kpi_rules (id, title, category, default_points, default_hours, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&rule.id)
        .bind(&rule.title)
        .bind(&rule.category)
        .bind(rule.default_points)
        .bind(rule.default_hours)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Define a new KPI rule.
    pub async fn create_kpi_rule(
        &self,
        request: &CreateKpiRuleRequest,
    ) -> Result<KpiRule, AppError> {
        let rule = KpiRule {
            id: format!("rule-{}", uuid::Uuid::new_v4().simple()),
            title: request.title.trim().to_string(),
            category: request.category.clone(),
            default_points: request.default_points,
            default_hours: request.default_hours,
        };

        self.insert_kpi_rule(&rule).await?;
        self.increment_revision().await?;

        Ok(rule)
    }

    pub async fn delete_kpi_rule(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM kpi_rules WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("KPI rule {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }
}
