use std::fmt;

use serde::Serialize;

use crate::db::models::{ClientRecord, Phase};

/// Outcome of a pipeline operation.
///
/// `Skipped` is the soft failure path: the caller has already been sent a warning
/// notice and nothing was written.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Transition {
    Applied(ClientRecord),
    Skipped(SkipReason),
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied(_))
    }

    pub fn client(&self) -> Option<&ClientRecord> {
        match self {
            Transition::Applied(client) => Some(client),
            Transition::Skipped(_) => None,
        }
    }

    pub fn into_client(self) -> Option<ClientRecord> {
        match self {
            Transition::Applied(client) => Some(client),
            Transition::Skipped(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            Transition::Applied(_) => None,
            Transition::Skipped(reason) => Some(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "value", rename_all = "snake_case")]
pub enum SkipReason {
    /// No client with this id.
    NotFound(String),
    /// Already in `running`; there is no next phase.
    Terminal,
    /// Operation only valid while the client is in `testing`.
    NotInTesting,
    /// Target equals the current phase.
    AlreadyInPhase(Phase),
    /// Target name is not one of the four phases.
    UnknownPhase(String),
}

/// Reasons without a client name (`NotFound`, `UnknownPhase`) read as a full sentence;
/// the rest follow a `"<client>: "` prefix.
impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotFound(id) => write!(f, "Client {id} not found"),
            SkipReason::Terminal => f.write_str("already in the final phase"),
            SkipReason::NotInTesting => f.write_str("not in the testing phase"),
            SkipReason::AlreadyInPhase(p) => write!(f, "already in {}", p.label()),
            SkipReason::UnknownPhase(name) => write!(f, "Unknown phase '{name}'"),
        }
    }
}

/// Result of one auto-switch sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub as_of: String,
    /// Armed clients whose date had passed.
    pub due: usize,
    pub advanced: usize,
    pub skipped: usize,
}
