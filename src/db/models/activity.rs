use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A single entry in the capped activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ActivityEntry {
    pub id: String,
    /// Operation type: "create", "update", "delete"
    pub action: String,
    pub client_id: Option<String>,
    pub message: String,
    pub actor: String,
    pub created_at: String,
}
