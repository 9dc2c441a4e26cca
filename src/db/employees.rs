//! Employee persistence.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::repository::{concurrent_modification, enum_column};
use super::Repository;
use crate::errors::AppError;
use crate::models::{Employee, EmployeeStatus, RegisterEmployeeRequest, Role};

const EMPLOYEE_COLUMNS: &str = "id, name, email, role, department_id, avatar, kpi, kpi_target, joined_date, status, updated_at, version";

/// Department given to self-registered accounts until an admin approves them.
pub const DEFAULT_DEPARTMENT: &str = "arch";

impl Repository {
    /// List all employees, including pending registrations.
    pub async fn list_employees(&self) -> Result<Vec<Employee>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM employees ORDER BY rowid",
            EMPLOYEE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(employee_from_row).collect()
    }

    /// List registrations waiting for approval.
    pub async fn list_pending_employees(&self) -> Result<Vec<Employee>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM employees WHERE status = ? ORDER BY rowid",
            EMPLOYEE_COLUMNS
        ))
        .bind(EmployeeStatus::Pending.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(employee_from_row).collect()
    }

    /// Get an employee by ID.
    pub async fn get_employee(&self, id: &str) -> Result<Option<Employee>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM employees WHERE id = ?",
            EMPLOYEE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(employee_from_row).transpose()
    }

    /// Insert a fully-formed employee record.
    pub async fn insert_employee(&self, employee: &Employee) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO employees (id, name, email, role, department_id, avatar, kpi, kpi_target, joined_date, status, created_at, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&employee.id)
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(employee.role.as_str())
        .bind(&employee.department_id)
        .bind(&employee.avatar)
        .bind(employee.kpi)
        .bind(employee.kpi_target)
        .bind(employee.joined_date)
        .bind(employee.status.as_str())
        .bind(&now)
        .bind(&employee.updated_at)
        .bind(employee.version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Create a pending account from a self-service registration.
    pub async fn register_employee(
        &self,
        request: &RegisterEmployeeRequest,
    ) -> Result<Employee, AppError> {
        let now = Utc::now();
        let id = format!("emp-{}", uuid::Uuid::new_v4().simple());
        let employee = Employee {
            avatar: avatar_url(&id),
            id,
            name: request.name.trim().to_string(),
            email: request.email.trim().to_string(),
            role: Role::Employee,
            department_id: DEFAULT_DEPARTMENT.to_string(),
            kpi: 0.0,
            kpi_target: None,
            joined_date: now.date_naive(),
            status: EmployeeStatus::Pending,
            updated_at: now.to_rfc3339(),
            version: 1,
        };

        self.insert_employee(&employee).await?;
        self.increment_revision().await?;

        Ok(employee)
    }

    /// Persist changes to `employee`, whose `version` is the one it was read at.
    pub async fn update_employee(&self, employee: &Employee) -> Result<Employee, AppError> {
        let now = Utc::now().to_rfc3339();
        let new_version = employee.version + 1;

        // Use conditional UPDATE with version check to prevent race conditions
        let result = sqlx::query(
            "UPDATE employees SET name = ?, email = ?, role = ?, department_id = ?, avatar = ?, kpi = ?, kpi_target = ?, status = ?, updated_at = ?, version = ? WHERE id = ? AND version = ?",
        )
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(employee.role.as_str())
        .bind(&employee.department_id)
        .bind(&employee.avatar)
        .bind(employee.kpi)
        .bind(employee.kpi_target)
        .bind(employee.status.as_str())
        .bind(&now)
        .bind(new_version)
        .bind(&employee.id)
        .bind(employee.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(match self.get_employee(&employee.id).await? {
                Some(current) => concurrent_modification(current.version),
                None => AppError::NotFound(format!("Employee {} not found", employee.id)),
            });
        }

        self.increment_revision().await?;

        Ok(Employee {
            updated_at: now,
            version: new_version,
            ..employee.clone()
        })
    }
}

/// Generated avatar for accounts without an uploaded picture.
pub fn avatar_url(seed: &str) -> String {
    format!("https://i.pravatar.cc/150?u={}", seed)
}

fn employee_from_row(row: &SqliteRow) -> Result<Employee, AppError> {
    Ok(Employee {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        role: enum_column(row, "role", Role::parse)?,
        department_id: row.get("department_id"),
        avatar: row.get("avatar"),
        kpi: row.get("kpi"),
        kpi_target: row.get("kpi_target"),
        joined_date: row.try_get("joined_date")?,
        status: enum_column(row, "status", EmployeeStatus::parse)?,
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    })
}
