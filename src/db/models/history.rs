use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::Phase;

/// One phase transition. Append-only; `client_id` is a plain value so entries
/// outlive the client they describe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HistoryEntry {
    pub id: String,
    pub client_id: String,
    pub client_name: String,
    /// `None` for the entry written at creation.
    pub from_phase: Option<Phase>,
    pub to_phase: Phase,
    pub changed_by: String,
    pub created_at: String,
}
