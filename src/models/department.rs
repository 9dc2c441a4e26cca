//! Department model.

use serde::{Deserialize, Serialize};

/// An engineering or support department.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: String,
    pub name: String,
    pub color: String,
    /// Target average KPI for the department as a whole
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kpi_target: Option<f64>,
}
