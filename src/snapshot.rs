//! JSON snapshot of the client collection, in the camelCase shape the browser
//! build kept in local storage.
//!
//! Import is lenient at the file level: a missing or malformed snapshot reads as an
//! empty collection. Individual records that fail validation are skipped and counted.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{ClientRecord, Phase, DEFAULT_AUTO_SWITCH_DAYS};
use crate::db::repos::clients;
use crate::db::DbPool;
use crate::engine::{priority, Session};
use crate::error::AppError;
use crate::notifications;

/// Legacy timestamps were either RFC 3339 strings or epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LegacyStamp {
    Millis(i64),
    Text(String),
}

impl LegacyStamp {
    /// Normalize to the fixed-width stamp form. Unparseable values come back empty,
    /// which the store replaces with the current time.
    fn normalize(&self) -> String {
        let parsed = match self {
            LegacyStamp::Millis(ms) => DateTime::<Utc>::from_timestamp_millis(*ms),
            LegacyStamp::Text(s) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|d| d.with_timezone(&Utc)),
        };
        parsed.map(crate::db::format_timestamp).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotClient {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub phase: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_rank: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_entered_at: Option<LegacyStamp>,
    #[serde(default)]
    pub auto_switch: bool,
    #[serde(default = "default_days")]
    pub auto_switch_days: i64,
    #[serde(default)]
    pub next_phase_date: Option<String>,
    #[serde(default)]
    pub subscription_started: bool,
    #[serde(default)]
    pub subscription_usage: i64,
    #[serde(default)]
    pub testing_round: i64,
    #[serde(default)]
    pub resubscription_count: i64,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub package_price: Option<f64>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<LegacyStamp>,
}

fn default_days() -> i64 {
    DEFAULT_AUTO_SWITCH_DAYS
}

impl From<ClientRecord> for SnapshotClient {
    fn from(c: ClientRecord) -> Self {
        Self {
            id: c.id,
            name: c.name,
            phase: c.phase.as_str().to_string(),
            priority: c.priority,
            manual_rank: c.manual_rank,
            phase_entered_at: Some(LegacyStamp::Text(c.phase_entered_at)),
            auto_switch: c.auto_switch,
            auto_switch_days: c.auto_switch_days,
            next_phase_date: c.next_phase_date,
            subscription_started: c.subscription_started,
            subscription_usage: c.subscription_usage,
            testing_round: c.testing_round,
            resubscription_count: c.resubscription_count,
            package_name: c.package_name,
            package_price: c.package_price,
            payment_status: c.payment_status,
            contact_name: c.contact_name,
            contact_email: c.contact_email,
            contact_phone: c.contact_phone,
            notes: c.notes,
            created_at: Some(LegacyStamp::Text(c.created_at)),
        }
    }
}

impl SnapshotClient {
    /// Convert to a storable record. A blank id gets a fresh uuid.
    pub fn into_record(self) -> Result<ClientRecord, AppError> {
        let phase = Phase::parse(&self.phase)
            .ok_or_else(|| AppError::Validation(format!("Unknown phase '{}'", self.phase)))?;
        let id = if self.id.trim().is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            self.id.trim().to_string()
        };
        let stamp = |s: &Option<LegacyStamp>| s.as_ref().map(LegacyStamp::normalize).unwrap_or_default();

        Ok(ClientRecord {
            id,
            name: self.name,
            phase,
            priority: self.priority,
            manual_rank: self.manual_rank,
            phase_entered_at: stamp(&self.phase_entered_at),
            auto_switch: self.auto_switch,
            auto_switch_days: self.auto_switch_days,
            next_phase_date: self.next_phase_date.filter(|d| !d.trim().is_empty()),
            subscription_started: self.subscription_started,
            subscription_usage: self.subscription_usage,
            testing_round: self.testing_round,
            resubscription_count: self.resubscription_count,
            package_name: self.package_name,
            package_price: self.package_price,
            payment_status: self.payment_status,
            contact_name: self.contact_name,
            contact_email: self.contact_email,
            contact_phone: self.contact_phone,
            notes: self.notes,
            created_at: stamp(&self.created_at),
            updated_at: String::new(),
        })
    }
}

/// A bare array, or the array wrapped as `{ "clients": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotDocument {
    List(Vec<serde_json::Value>),
    Wrapped { clients: Vec<serde_json::Value> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Entries found in the document.
    pub read: usize,
    pub imported: usize,
    pub rejected: usize,
    /// True when the file was missing or unreadable and was treated as empty.
    pub degraded: bool,
}

/// Write every client to `path` as a pretty-printed JSON array. Returns the count.
pub fn export(pool: &DbPool, path: &Path) -> Result<usize, AppError> {
    let snapshot: Vec<SnapshotClient> = clients::get_all(pool)?
        .into_iter()
        .map(SnapshotClient::from)
        .collect();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&snapshot)?;
    std::fs::write(path, json)?;

    tracing::info!(path = %path.display(), count = snapshot.len(), "Snapshot exported");
    Ok(snapshot.len())
}

fn read_document(path: &Path) -> Option<Vec<serde_json::Value>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Snapshot unreadable, treating as empty");
            return None;
        }
    };
    match serde_json::from_str::<SnapshotDocument>(&raw) {
        Ok(SnapshotDocument::List(items)) | Ok(SnapshotDocument::Wrapped { clients: items }) => Some(items),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Snapshot malformed, treating as empty");
            None
        }
    }
}

/// Upsert every record in the snapshot at `path`, then recompute priorities.
pub fn import(session: &Session, path: &Path) -> Result<ImportReport, AppError> {
    let Some(items) = read_document(path) else {
        notifications::warning(
            session.notifier(),
            format!("Could not read snapshot {}, nothing imported", path.display()),
        );
        return Ok(ImportReport { degraded: true, ..ImportReport::default() });
    };

    let mut report = ImportReport { read: items.len(), ..ImportReport::default() };
    for (idx, item) in items.into_iter().enumerate() {
        let record = serde_json::from_value::<SnapshotClient>(item)
            .map_err(AppError::from)
            .and_then(SnapshotClient::into_record);
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                report.rejected += 1;
                tracing::warn!(index = idx, error = %e, "Snapshot entry rejected");
                continue;
            }
        };
        match clients::put(&session.db, &record, session.audit()) {
            Ok(_) => report.imported += 1,
            Err(AppError::Validation(msg)) => {
                report.rejected += 1;
                tracing::warn!(index = idx, client_id = %record.id, error = %msg, "Snapshot entry rejected");
            }
            Err(e) => return Err(e),
        }
    }

    priority::recalculate_all(session)?;
    tracing::info!(read = report.read, imported = report.imported, rejected = report.rejected, "Snapshot imported");

    if report.rejected > 0 {
        notifications::warning(
            session.notifier(),
            format!("Imported {} clients, {} rejected", report.imported, report.rejected),
        );
    } else {
        notifications::success(session.notifier(), format!("Imported {} clients", report.imported));
    }
    Ok(report)
}
