//! Performance insights from an external text-generation service.
//!
//! The service is optional. Any failure, including a missing endpoint,
//! yields [`FALLBACK_INSIGHT`] instead of an error.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::{Employee, Task, TaskStatus};

pub const FALLBACK_INSIGHT: &str =
    "Performance insight is unavailable right now. Review the KPI trend and open tasks manually.";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
struct InsightRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct InsightResponse {
    text: String,
}

/// Client for the insight endpoint.
#[derive(Clone)]
pub struct InsightClient {
    http: reqwest::Client,
    endpoint: Option<String>,
}

impl InsightClient {
    pub fn new(endpoint: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { http, endpoint }
    }

    /// Free-text performance summary of `employee`.
    pub async fn employee_report(&self, employee: &Employee, tasks: &[Task]) -> String {
        let Some(endpoint) = &self.endpoint else {
            return FALLBACK_INSIGHT.to_string();
        };

        let prompt = build_prompt(employee, tasks);
        match self.request(endpoint, &prompt).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!("Insight service returned an empty report");
                FALLBACK_INSIGHT.to_string()
            }
            Err(e) => {
                tracing::warn!("Insight service unavailable: {}", e);
                FALLBACK_INSIGHT.to_string()
            }
        }
    }

    async fn request(&self, endpoint: &str, prompt: &str) -> Result<String, reqwest::Error> {
        let response = self
            .http
            .post(endpoint)
            .json(&InsightRequest { prompt })
            .send()
            .await?
            .error_for_status()?;
        let body: InsightResponse = response.json().await?;
        Ok(body.text)
    }
}

/// Prompt describing the employee and a summary of their workload.
pub fn build_prompt(employee: &Employee, tasks: &[Task]) -> String {
    let completed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    let estimated: f64 = tasks.iter().map(|t| t.estimated_hours).sum();
    let actual: f64 = tasks.iter().map(|t| t.actual_hours).sum();
    let points: i64 = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .map(|t| t.kpi_points)
        .fold(0, i64::saturating_add);

    let mut prompt = format!(
        "Write a short performance review for {} ({}, department {}). \
         Current KPI: {}. Tasks: {} total, {} completed. \
         Hours: {} estimated, {} actual. KPI points earned: {}.",
        employee.name,
        employee.role,
        employee.department_id,
        employee.kpi,
        tasks.len(),
        completed,
        estimated,
        actual,
        points
    );
    if let Some(target) = employee.kpi_target {
        prompt.push_str(&format!(" KPI target: {}.", target));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{sample_task, EmployeeStatus, Role};
    use chrono::NaiveDate;

    fn employee() -> Employee {
        Employee {
            id: "emp-2".to_string(),
            name: "Eng. Sara Khaled".to_string(),
            email: "sara@takween.com".to_string(),
            role: Role::DeptManager,
            department_id: "interior".to_string(),
            avatar: String::new(),
            kpi: 88.0,
            kpi_target: Some(90.0),
            joined_date: NaiveDate::from_ymd_opt(2023, 3, 10).unwrap(),
            status: EmployeeStatus::Active,
            updated_at: String::new(),
            version: 1,
        }
    }

    #[test]
    fn test_prompt_summarises_workload() {
        let mut done = sample_task("t1", "interior", "emp-2");
        done.status = TaskStatus::Completed;
        let open = sample_task("t2", "interior", "emp-2");

        let prompt = build_prompt(&employee(), &[done, open]);
        assert!(prompt.contains("Eng. Sara Khaled"));
        assert!(prompt.contains("DEPT_MANAGER"));
        assert!(prompt.contains("2 total, 1 completed"));
        assert!(prompt.contains("KPI points earned: 50"));
        assert!(prompt.contains("KPI target: 90"));
    }

    #[tokio::test]
    async fn test_no_endpoint_falls_back() {
        let client = InsightClient::new(None);
        assert_eq!(client.employee_report(&employee(), &[]).await, FALLBACK_INSIGHT);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_falls_back() {
        let client = InsightClient::new(Some("http://127.0.0.1:9/insight".to_string()));
        assert_eq!(client.employee_report(&employee(), &[]).await, FALLBACK_INSIGHT);
    }
}
