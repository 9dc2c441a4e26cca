//! Demo data for a fresh database.
//!
//! Seeding is deterministic: the same ids, departments and KPI scores are
//! produced on every run.

use chrono::NaiveDate;
use sqlx::Row;

use super::employees::avatar_url;
use super::Repository;
use crate::errors::AppError;
use crate::models::{
    Department, Employee, EmployeeStatus, KpiRule, Project, ProjectStatus, Role, Sprint,
    SprintStatus, Task, TaskPriority, TaskStatus,
};

const SEEDED_AT: &str = "2024-05-01T08:00:00+00:00";

/// (id, name, color)
const DEPARTMENTS: [(&str, &str, &str); 6] = [
    ("arch", "Architecture", "#2563eb"),
    ("struct", "Structural Engineering", "#10b981"),
    ("interior", "Interior Design", "#ec4899"),
    ("market", "Marketing", "#8b5cf6"),
    ("hr", "Human Resources", "#06b6d4"),
    ("acc", "Accounting", "#ef4444"),
];

/// (id, title, category, points, hours)
const KPI_RULES: [(&str, &str, &str, i64, f64); 5] = [
    ("rule-1", "Final drawings review", "Design", 50, 4.0),
    ("rule-2", "Quantity survey", "Engineering", 30, 8.0),
    ("rule-3", "Site visit and inspection", "Supervision", 40, 3.0),
    ("rule-4", "3D facade design", "Architecture", 100, 12.0),
    ("rule-5", "Monthly financial report", "Management", 20, 2.0),
];

const FIRST_NAMES: [&str; 10] = [
    "Omar", "Zainab", "Mohammed", "Layla", "Khaled", "Fatima", "Yassin", "Noor", "Youssef",
    "Maryam",
];
const LAST_NAMES: [&str; 8] = [
    "Al-Sayed", "Mansour", "Kamel", "Jalal", "Basem", "Radi", "Hammad", "Abbas",
];

/// Number of generated staff accounts, `emp-1` through `emp-48`.
const STAFF_COUNT: usize = 48;

/// Insert the demo data set when the database holds no employees yet.
///
/// Returns whether anything was inserted.
pub async fn seed_demo_data(repo: &Repository) -> Result<bool, AppError> {
    let existing: i64 = sqlx::query("SELECT COUNT(*) AS n FROM employees")
        .fetch_one(&repo.pool)
        .await?
        .get("n");
    if existing > 0 {
        return Ok(false);
    }

    for (position, (id, name, color)) in DEPARTMENTS.iter().enumerate() {
        let department = Department {
            id: id.to_string(),
            name: name.to_string(),
            color: color.to_string(),
            kpi_target: None,
        };
        repo.insert_department(&department, position as i64).await?;
    }

    for (id, title, category, points, hours) in KPI_RULES {
        let rule = KpiRule {
            id: id.to_string(),
            title: title.to_string(),
            category: category.to_string(),
            default_points: points,
            default_hours: hours,
        };
        repo.insert_kpi_rule(&rule).await?;
    }

    for employee in demo_employees()? {
        repo.insert_employee(&employee).await?;
    }

    let [first, second, third] = demo_projects()?;
    repo.insert_project(&first, &[demo_task()?]).await?;
    repo.insert_project(&second, &[]).await?;
    repo.insert_project(&third, &[]).await?;

    for sprint in demo_sprints()? {
        repo.insert_sprint(&sprint).await?;
    }

    repo.increment_revision().await?;
    tracing::info!("Seeded demo data: {} employees", STAFF_COUNT);
    Ok(true)
}

fn date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| AppError::Internal(format!("Invalid seed date {}: {}", s, e)))
}

fn demo_employees() -> Result<Vec<Employee>, AppError> {
    let mut employees = vec![
        Employee {
            id: "emp-1".to_string(),
            name: "Eng. Ahmed Mahmoud".to_string(),
            email: "ahmed@takween.com".to_string(),
            role: Role::Admin,
            department_id: "arch".to_string(),
            avatar: avatar_url("ahmed"),
            kpi: 94.0,
            kpi_target: None,
            joined_date: date("2023-01-15")?,
            status: EmployeeStatus::Active,
            updated_at: SEEDED_AT.to_string(),
            version: 1,
        },
        Employee {
            id: "emp-2".to_string(),
            name: "Eng. Sara Khaled".to_string(),
            email: "sara@takween.com".to_string(),
            role: Role::DeptManager,
            department_id: "interior".to_string(),
            avatar: avatar_url("sara"),
            kpi: 88.0,
            kpi_target: None,
            joined_date: date("2023-03-10")?,
            status: EmployeeStatus::Active,
            updated_at: SEEDED_AT.to_string(),
            version: 1,
        },
    ];

    let joined = date("2023-06-01")?;
    for i in 3..=STAFF_COUNT {
        let id = format!("emp-{}", i);
        employees.push(Employee {
            avatar: avatar_url(&format!("emp{}", i)),
            name: format!(
                "Eng. {} {}",
                FIRST_NAMES[i % FIRST_NAMES.len()],
                LAST_NAMES[i % LAST_NAMES.len()]
            ),
            email: format!("user{}@takween.com", i),
            role: if i < 10 {
                Role::TeamLeader
            } else {
                Role::Employee
            },
            department_id: DEPARTMENTS[i % DEPARTMENTS.len()].0.to_string(),
            kpi: (60 + (i * 13) % 40) as f64,
            kpi_target: None,
            joined_date: joined,
            status: EmployeeStatus::Active,
            updated_at: SEEDED_AT.to_string(),
            version: 1,
            id,
        });
    }

    Ok(employees)
}

fn demo_projects() -> Result<[Project; 3], AppError> {
    let project = |id: &str,
                   name: &str,
                   client: &str,
                   budget: f64,
                   status: ProjectStatus,
                   deadline: &str,
                   manager_id: &str,
                   department_id: &str|
     -> Result<Project, AppError> {
        Ok(Project {
            id: id.to_string(),
            name: name.to_string(),
            client: client.to_string(),
            budget,
            status,
            deadline: date(deadline)?,
            manager_id: manager_id.to_string(),
            department_id: department_id.to_string(),
            created_at: SEEDED_AT.to_string(),
            updated_at: SEEDED_AT.to_string(),
            version: 1,
        })
    };

    Ok([
        project(
            "proj-1",
            "Takween Residential Tower",
            "Al-Emar Real Estate",
            5_000_000.0,
            ProjectStatus::Active,
            "2025-12-01",
            "emp-1",
            "arch",
        )?,
        project(
            "proj-2",
            "Royal Villa - Dubai",
            "Private client",
            1_200_000.0,
            ProjectStatus::Active,
            "2024-10-15",
            "emp-2",
            "interior",
        )?,
        project(
            "proj-3",
            "Science Oasis Complex",
            "University of Bahrain",
            8_500_000.0,
            ProjectStatus::OnHold,
            "2026-05-20",
            "emp-1",
            "struct",
        )?,
    ])
}

fn demo_sprints() -> Result<Vec<Sprint>, AppError> {
    let sprint = |id: &str,
                  name: &str,
                  start: &str,
                  end: &str,
                  status: SprintStatus,
                  project_id: &str|
     -> Result<Sprint, AppError> {
        Ok(Sprint {
            id: id.to_string(),
            name: name.to_string(),
            start_date: date(start)?,
            end_date: date(end)?,
            status,
            project_id: project_id.to_string(),
            extensions: Vec::new(),
            created_at: SEEDED_AT.to_string(),
            updated_at: SEEDED_AT.to_string(),
            version: 1,
        })
    };

    Ok(vec![
        sprint(
            "spr-1",
            "Foundation design - phase 1",
            "2024-05-01",
            "2024-05-30",
            SprintStatus::Active,
            "proj-1",
        )?,
        sprint(
            "spr-2",
            "Interior decor - royal wing",
            "2024-06-01",
            "2024-06-15",
            SprintStatus::Planned,
            "proj-2",
        )?,
    ])
}

fn demo_task() -> Result<Task, AppError> {
    Ok(Task {
        id: "task-1".to_string(),
        title: "Administrative building facade design".to_string(),
        description: "Review the final drawings of the main building facade in the Takween Tower project.".to_string(),
        status: TaskStatus::InProgress,
        priority: TaskPriority::High,
        assigned_to: "emp-1".to_string(),
        department_id: "arch".to_string(),
        project_id: Some("proj-1".to_string()),
        due_date: date("2024-05-30")?,
        estimated_hours: 20.0,
        actual_hours: 5.0,
        comments: Vec::new(),
        attachments: Vec::new(),
        kpi_points: 50,
        weight: 20,
        created_at: SEEDED_AT.to_string(),
        updated_at: SEEDED_AT.to_string(),
        version: 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_employees_are_deterministic() {
        let first = demo_employees().unwrap();
        let second = demo_employees().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), STAFF_COUNT);
        assert_eq!(first[0].role, Role::Admin);
        assert_eq!(first[1].department_id, "interior");
        // emp-9 is the last team leader
        assert_eq!(first[8].id, "emp-9");
        assert_eq!(first[8].role, Role::TeamLeader);
        assert_eq!(first[9].role, Role::Employee);
        assert!(first.iter().all(|e| (60.0..100.0).contains(&e.kpi)));
    }

    #[test]
    fn test_demo_department_ids_are_known() {
        let known: Vec<&str> = DEPARTMENTS.iter().map(|d| d.0).collect();
        for employee in demo_employees().unwrap() {
            assert!(known.contains(&employee.department_id.as_str()));
        }
        for project in demo_projects().unwrap() {
            assert!(known.contains(&project.department_id.as_str()));
        }
    }
}
