#[macro_use]
pub mod macros;
pub mod migrations;
pub mod models;
pub mod repos;
pub mod settings_keys;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::{CustomizeConnection, Pool};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::ToSql;

use crate::error::AppError;

pub type DbPool = Pool<SqliteConnectionManager>;

/// File name of the pipeline database inside the data directory.
pub const DB_FILE_NAME: &str = "gaia.db";

/// Connection customizer that sets per-connection SQLite pragmas.
#[derive(Debug)]
struct SqlitePragmaCustomizer;

impl CustomizeConnection<rusqlite::Connection, rusqlite::Error> for SqlitePragmaCustomizer {
    fn on_acquire(&self, conn: &mut rusqlite::Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;",
        )?;
        Ok(())
    }
}

/// Initialize the database: create the directory and file, enable WAL, run migrations.
pub fn init_db(data_dir: &Path, pool_size: u32) -> Result<DbPool, AppError> {
    std::fs::create_dir_all(data_dir)?;
    let db_path = data_dir.join(DB_FILE_NAME);

    tracing::info!(path = %db_path.display(), "Initializing database");

    let manager = SqliteConnectionManager::file(&db_path);
    let pool = Pool::builder()
        .max_size(pool_size.max(1))
        .connection_customizer(Box::new(SqlitePragmaCustomizer))
        .build(manager)?;

    // WAL is database-wide, only needs to run once
    {
        let conn = pool.get()?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        tracing::debug!("SQLite pragmas configured (WAL, FK, busy_timeout)");
    }

    {
        let conn = pool.get()?;
        migrations::run(&conn)?;
        migrations::run_incremental(&conn)?;
    }

    tracing::info!("Database initialized successfully");
    Ok(pool)
}

/// Current time in the fixed-width form every timestamp column uses.
///
/// Microsecond precision with a `Z` suffix, so lexical order matches time order.
pub fn timestamp() -> String {
    format_timestamp(Utc::now())
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Partial-update builder: `SET` fragments plus their bound parameters, numbered in
/// push order. The row id is bound last.
#[derive(Default)]
pub struct SetClause {
    sets: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl SetClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<T: ToSql + 'static>(&mut self, column: &str, value: T) {
        self.params.push(Box::new(value));
        self.sets.push(format!("{column} = ?{}", self.params.len()));
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// `UPDATE {table} SET ... WHERE id = ?`. Returns the number of rows changed.
    pub fn execute(self, conn: &rusqlite::Connection, table: &str, id: &str) -> Result<usize, AppError> {
        if self.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "UPDATE {table} SET {} WHERE id = ?{}",
            self.sets.join(", "),
            self.params.len() + 1
        );
        let mut bound: Vec<&dyn ToSql> = self.params.iter().map(|p| p.as_ref()).collect();
        bound.push(&id);
        Ok(conn.execute(&sql, bound.as_slice())?)
    }
}

#[cfg(test)]
pub fn init_test_db() -> Result<DbPool, AppError> {
    use std::time::Duration;

    // Unique temp file per test; in-memory databases don't survive across r2d2 connections.
    let tmp = std::env::temp_dir().join(format!("gaia_test_{}.db", uuid::Uuid::new_v4()));
    let manager = SqliteConnectionManager::file(&tmp);
    let pool = Pool::builder()
        .max_size(2)
        .connection_timeout(Duration::from_secs(5))
        .connection_customizer(Box::new(SqlitePragmaCustomizer))
        .build(manager)?;

    let conn = pool.get()?;
    migrations::run(&conn)?;
    migrations::run_incremental(&conn)?;
    drop(conn);
    Ok(pool)
}
