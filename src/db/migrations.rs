use rusqlite::Connection;

use crate::error::AppError;

/// Run the base schema. Every statement is idempotent.
pub fn run(conn: &Connection) -> Result<(), AppError> {
    tracing::debug!("Running database migrations");

    conn.execute_batch(SCHEMA)?;

    tracing::info!("Database migrations complete");
    Ok(())
}

const SCHEMA: &str = r#"

-- ============================================================================
-- Clients (one row per tracked business client)
-- ============================================================================

CREATE TABLE IF NOT EXISTS clients (
    id                      TEXT PRIMARY KEY,
    name                    TEXT NOT NULL,
    phase                   TEXT NOT NULL DEFAULT 'preparing'
                            CHECK (phase IN ('booked', 'preparing', 'testing', 'running')),
    priority                INTEGER NOT NULL DEFAULT 1,
    phase_entered_at        TEXT NOT NULL,
    auto_switch             INTEGER NOT NULL DEFAULT 0,
    auto_switch_days        INTEGER NOT NULL DEFAULT 7,
    next_phase_date         TEXT,
    subscription_started    INTEGER NOT NULL DEFAULT 0,
    subscription_usage      INTEGER NOT NULL DEFAULT 0,
    testing_round           INTEGER NOT NULL DEFAULT 0,
    resubscription_count    INTEGER NOT NULL DEFAULT 0,
    package_name            TEXT,
    package_price           REAL,
    payment_status          TEXT,
    contact_name            TEXT,
    contact_email           TEXT,
    contact_phone           TEXT,
    notes                   TEXT,
    created_at              TEXT NOT NULL,
    updated_at              TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_clients_phase        ON clients(phase, priority);
CREATE INDEX IF NOT EXISTS idx_clients_auto_switch  ON clients(auto_switch, next_phase_date);

-- ============================================================================
-- Phase history (append-only; keyed by client id value, no FK so rows
-- outlive archived clients)
-- ============================================================================

CREATE TABLE IF NOT EXISTS phase_history (
    id              TEXT PRIMARY KEY,
    client_id       TEXT NOT NULL,
    client_name     TEXT NOT NULL,
    from_phase      TEXT,
    to_phase        TEXT NOT NULL,
    changed_by      TEXT NOT NULL,
    created_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_phase_history_client   ON phase_history(client_id, created_at);
CREATE INDEX IF NOT EXISTS idx_phase_history_created  ON phase_history(created_at);

-- ============================================================================
-- Activity log (free-text record of store mutations, capped)
-- ============================================================================

CREATE TABLE IF NOT EXISTS activity_log (
    id              TEXT PRIMARY KEY,
    action          TEXT NOT NULL,
    client_id       TEXT,
    message         TEXT NOT NULL,
    actor           TEXT NOT NULL,
    created_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_activity_log_created ON activity_log(created_at);

-- ============================================================================
-- App settings (key/value)
-- ============================================================================

CREATE TABLE IF NOT EXISTS app_settings (
    key             TEXT PRIMARY KEY,
    value           TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);
"#;

/// Column additions for databases created before the column existed.
pub fn run_incremental(conn: &Connection) -> Result<(), AppError> {
    // Sticky manual order from drag-and-drop reorder
    let has_manual_rank: bool = conn
        .prepare("SELECT COUNT(*) FROM pragma_table_info('clients') WHERE name = 'manual_rank'")?
        .query_row([], |row| row.get::<_, i64>(0))
        .map(|c| c > 0)
        .unwrap_or(false);

    if !has_manual_rank {
        conn.execute_batch("ALTER TABLE clients ADD COLUMN manual_rank INTEGER;")?;
        tracing::info!("Added manual_rank column to clients");
    }

    Ok(())
}
