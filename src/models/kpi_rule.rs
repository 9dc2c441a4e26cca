//! KPI rule templates used to pre-fill task creation.

use serde::{Deserialize, Serialize};

/// A reusable template for a recurring kind of task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KpiRule {
    pub id: String,
    pub title: String,
    pub category: String,
    pub default_points: i64,
    pub default_hours: f64,
}

/// Request body for defining a KPI rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKpiRuleRequest {
    pub title: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_points")]
    pub default_points: i64,
    #[serde(default = "default_hours")]
    pub default_hours: f64,
}

fn default_category() -> String {
    "General".to_string()
}

fn default_points() -> i64 {
    20
}

fn default_hours() -> f64 {
    2.0
}
