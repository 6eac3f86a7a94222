pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod logging;
pub mod notifications;
pub mod snapshot;
pub mod validation;

use std::sync::Arc;

pub use config::AppConfig;
pub use db::models::{ClientRecord, CreateClientInput, Phase, UpdateClientInput};
pub use db::DbPool;
pub use engine::{Session, SkipReason, SweepReport, Transition};
pub use error::AppError;
pub use notifications::{Notice, NoticeLevel, Notifier};

/// Everything an embedding front end needs to drive the pipeline.
pub struct AppState {
    pub db: DbPool,
    pub session: Session,
}

impl AppState {
    /// Open (and migrate) the database under `config.data_dir` and resolve the acting user.
    pub fn open(config: &AppConfig, notifier: Arc<dyn Notifier>) -> Result<Self, AppError> {
        let pool = db::init_db(&config.data_dir, config.db_pool_size)?;
        tracing::info!(
            path = %config.data_dir.display(),
            pool_size = config.db_pool_size,
            "Database pool ready"
        );

        // Apply a lowered history cap at startup.
        let dropped = db::repos::history::trim(&pool, config.history_cap)?;
        if dropped > 0 {
            tracing::info!(dropped, keep = config.history_cap, "Trimmed phase history");
        }

        let session = Session::from_config(pool.clone(), config, notifier)?;
        tracing::info!(actor = %session.actor, "Session started");
        Ok(Self { db: pool, session })
    }

    /// Session-start sweep. A failure here is logged and does not block the session.
    pub fn startup_sweep(&self) -> Option<SweepReport> {
        match engine::phases::process_auto_switches(&self.session) {
            Ok(report) => {
                if report.advanced > 0 {
                    notifications::info(
                        self.session.notifier(),
                        format!("Auto-switch advanced {} client(s)", report.advanced),
                    );
                }
                Some(report)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Auto-switch sweep failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::MemoryNotifier;

    #[test]
    fn open_creates_store_and_sweeps() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_dir: dir.path().to_path_buf(),
            actor: Some("Ops".into()),
            ..AppConfig::default()
        };
        let state = AppState::open(&config, Arc::new(MemoryNotifier::new())).unwrap();
        assert_eq!(state.session.actor, "Ops");

        let report = state.startup_sweep().unwrap();
        assert_eq!(report.due, 0);
        assert!(dir.path().join(db::DB_FILE_NAME).exists());
    }
}
