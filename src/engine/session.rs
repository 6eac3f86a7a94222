use std::sync::Arc;

use crate::config::{AppConfig, DEFAULT_ACTIVITY_CAP, DEFAULT_HISTORY_CAP};
use crate::db::repos::{settings, Audit};
use crate::db::settings_keys::CURRENT_USER;
use crate::db::DbPool;
use crate::error::AppError;
use crate::notifications::Notifier;

/// Attributed when nobody is signed in.
pub const UNKNOWN_ACTOR: &str = "Unknown User";

/// Explicit context for every pipeline operation: where to write, who is acting,
/// where notices go, and how much history/activity to retain.
#[derive(Clone)]
pub struct Session {
    pub db: DbPool,
    pub actor: String,
    pub notifier: Arc<dyn Notifier>,
    pub history_cap: u32,
    pub activity_cap: u32,
}

impl Session {
    pub fn new(db: DbPool, actor: impl Into<String>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            db,
            actor: actor.into(),
            notifier,
            history_cap: DEFAULT_HISTORY_CAP,
            activity_cap: DEFAULT_ACTIVITY_CAP,
        }
    }

    /// Build from config, resolving the actor via [`resolve_actor`].
    pub fn from_config(
        db: DbPool,
        config: &AppConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AppError> {
        let actor = resolve_actor(&db, config.actor.as_deref())?;
        Ok(Self {
            db,
            actor,
            notifier,
            history_cap: config.history_cap,
            activity_cap: config.activity_cap,
        })
    }

    pub fn audit(&self) -> Audit<'_> {
        Audit { actor: &self.actor, keep: self.activity_cap }
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }
}

/// Configured actor, else the stored `current_user` setting, else [`UNKNOWN_ACTOR`].
pub fn resolve_actor(pool: &DbPool, configured: Option<&str>) -> Result<String, AppError> {
    if let Some(name) = configured.map(str::trim).filter(|n| !n.is_empty()) {
        return Ok(name.to_string());
    }
    let stored = settings::get(pool, CURRENT_USER)?;
    Ok(stored
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_ACTOR.to_string()))
}
