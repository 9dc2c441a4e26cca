//! Activity log entries.

use serde::{Deserialize, Serialize};

/// One recorded mutation: who did what to which record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub user_id: String,
    pub action: String,
    pub target: String,
    pub timestamp: String,
}
