use rusqlite::{params, OptionalExtension};

use crate::db::DbPool;
use crate::error::AppError;

/// Stored value for `key`; `None` when unset. Keys live in `db::settings_keys`.
pub fn get(pool: &DbPool, key: &str) -> Result<Option<String>, AppError> {
    let conn = pool.get()?;
    let value = conn
        .query_row(
            "SELECT value FROM app_settings WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(value)
}

/// Upsert `key`. Returns the value it replaced, if any.
pub fn set(pool: &DbPool, key: &str, value: &str) -> Result<Option<String>, AppError> {
    let previous = get(pool, key)?;
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO app_settings (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, crate::db::timestamp()],
    )?;
    tracing::debug!(key, "Setting stored");
    Ok(previous)
}

pub fn delete(pool: &DbPool, key: &str) -> Result<bool, AppError> {
    let conn = pool.get()?;
    Ok(conn.execute("DELETE FROM app_settings WHERE key = ?1", params![key])? > 0)
}
