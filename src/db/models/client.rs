use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Phase
// ============================================================================

/// Pipeline stage a client occupies. Linear order by rank; `Running` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Booked,
    Preparing,
    Testing,
    Running,
}

impl Phase {
    /// Every phase, in pipeline order.
    pub const ALL: [Phase; 4] = [Phase::Booked, Phase::Preparing, Phase::Testing, Phase::Running];

    /// Phases whose priorities are recomputed. `Booked` keeps whatever it was seeded with.
    pub const RANKED: [Phase; 3] = [Phase::Preparing, Phase::Testing, Phase::Running];

    pub const fn rank(self) -> u8 {
        match self {
            Phase::Booked => 0,
            Phase::Preparing => 1,
            Phase::Testing => 2,
            Phase::Running => 3,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::Booked => "booked",
            Phase::Preparing => "preparing",
            Phase::Testing => "testing",
            Phase::Running => "running",
        }
    }

    /// Human label for notices.
    pub const fn label(self) -> &'static str {
        match self {
            Phase::Booked => "Booked",
            Phase::Preparing => "Preparing",
            Phase::Testing => "Testing",
            Phase::Running => "Running",
        }
    }

    /// Case-insensitive lookup; `None` for anything outside the fixed set.
    pub fn parse(name: &str) -> Option<Phase> {
        let name = name.trim();
        Phase::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(name))
    }

    pub fn next(self) -> Option<Phase> {
        Phase::ALL.get(self.rank() as usize + 1).copied()
    }

    pub fn previous(self) -> Option<Phase> {
        (self.rank() as usize)
            .checked_sub(1)
            .and_then(|i| Phase::ALL.get(i).copied())
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Phase {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Phase {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        Phase::parse(text).ok_or_else(|| {
            FromSqlError::Other(format!("unknown phase '{text}'").into())
        })
    }
}

// ============================================================================
// Client record
// ============================================================================

/// Default number of days between automatic phase advances.
pub const DEFAULT_AUTO_SWITCH_DAYS: i64 = 7;

/// Upper bound on the auto-switch interval (ten years).
pub const MAX_AUTO_SWITCH_DAYS: i64 = 3650;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientRecord {
    pub id: String,
    pub name: String,
    pub phase: Phase,
    /// Dense 1..N rank within `phase` after every recompute.
    pub priority: i64,
    /// Set by a manual reorder; wins over `phase_entered_at` until the phase changes.
    pub manual_rank: Option<i64>,
    pub phase_entered_at: String,
    pub auto_switch: bool,
    pub auto_switch_days: i64,
    /// `YYYY-MM-DD`
    pub next_phase_date: Option<String>,
    pub subscription_started: bool,
    pub subscription_usage: i64,
    pub testing_round: i64,
    pub resubscription_count: i64,
    pub package_name: Option<String>,
    pub package_price: Option<f64>,
    pub payment_status: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateClientInput {
    pub name: String,
    /// Defaults to `Preparing`.
    pub phase: Option<Phase>,
    pub auto_switch: Option<bool>,
    pub auto_switch_days: Option<i64>,
    pub next_phase_date: Option<String>,
    pub package_name: Option<String>,
    pub package_price: Option<f64>,
    pub payment_status: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
}

/// Field edits outside the state machine. Phase and the testing counters only
/// change through `engine::phases`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateClientInput {
    pub name: Option<String>,
    pub auto_switch: Option<bool>,
    pub auto_switch_days: Option<i64>,
    pub next_phase_date: Option<String>,
    pub package_name: Option<String>,
    pub package_price: Option<f64>,
    pub payment_status: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
}

impl UpdateClientInput {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.auto_switch.is_none()
            && self.auto_switch_days.is_none()
            && self.next_phase_date.is_none()
            && self.package_name.is_none()
            && self.package_price.is_none()
            && self.payment_status.is_none()
            && self.contact_name.is_none()
            && self.contact_email.is_none()
            && self.contact_phone.is_none()
            && self.notes.is_none()
    }
}
