use rusqlite::{params, Connection, Row};

use crate::db::models::{HistoryEntry, Phase};
use crate::db::DbPool;
use crate::error::AppError;

fn row_to_entry(row: &Row) -> rusqlite::Result<HistoryEntry> {
    Ok(HistoryEntry {
        id: row.get("id")?,
        client_id: row.get("client_id")?,
        client_name: row.get("client_name")?,
        from_phase: row.get("from_phase")?,
        to_phase: row.get("to_phase")?,
        changed_by: row.get("changed_by")?,
        created_at: row.get("created_at")?,
    })
}

// ---------------------------------------------------------------------------
// Insert (append-only)
// ---------------------------------------------------------------------------

/// Append one transition and cap the table at the newest `keep` rows.
pub fn insert(
    pool: &DbPool,
    client_id: &str,
    client_name: &str,
    from_phase: Option<Phase>,
    to_phase: Phase,
    changed_by: &str,
    keep: u32,
) -> Result<HistoryEntry, AppError> {
    let conn = pool.get()?;
    let entry = HistoryEntry {
        id: uuid::Uuid::new_v4().to_string(),
        client_id: client_id.to_string(),
        client_name: client_name.to_string(),
        from_phase,
        to_phase,
        changed_by: changed_by.to_string(),
        created_at: crate::db::timestamp(),
    };
    conn.execute(
        "INSERT INTO phase_history (id, client_id, client_name, from_phase, to_phase, changed_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.id,
            entry.client_id,
            entry.client_name,
            entry.from_phase,
            entry.to_phase,
            entry.changed_by,
            entry.created_at,
        ],
    )?;

    let dropped = trim_conn(&conn, keep)?;
    if dropped > 0 {
        tracing::debug!(dropped, keep, "Phase history over cap, dropped oldest entries");
    }
    Ok(entry)
}

/// Maintenance sweep: keep only the newest `keep` entries. Returns rows removed.
pub fn trim(pool: &DbPool, keep: u32) -> Result<usize, AppError> {
    let conn = pool.get()?;
    trim_conn(&conn, keep)
}

fn trim_conn(conn: &Connection, keep: u32) -> Result<usize, AppError> {
    let removed = conn.execute(
        "DELETE FROM phase_history WHERE id NOT IN (
             SELECT id FROM phase_history ORDER BY created_at DESC, rowid DESC LIMIT ?1
         )",
        params![keep],
    )?;
    Ok(removed)
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Every retained entry for a client, newest first. Works for archived clients too.
pub fn list_for(pool: &DbPool, client_id: &str) -> Result<Vec<HistoryEntry>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM phase_history
         WHERE client_id = ?1
         ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt.query_map(params![client_id], row_to_entry)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// Entries across all clients, newest first.
pub fn get_recent(pool: &DbPool, limit: u32) -> Result<Vec<HistoryEntry>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM phase_history ORDER BY created_at DESC, rowid DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], row_to_entry)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn count(pool: &DbPool) -> Result<i64, AppError> {
    let conn = pool.get()?;
    let n = conn.query_row("SELECT COUNT(*) FROM phase_history", [], |row| row.get(0))?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;

    #[test]
    fn test_append_and_list_newest_first() {
        let pool = init_test_db().unwrap();
        insert(&pool, "c1", "Acme", None, Phase::Preparing, "Dana", 500).unwrap();
        insert(&pool, "c2", "Globex", None, Phase::Booked, "Dana", 500).unwrap();
        insert(&pool, "c1", "Acme", Some(Phase::Preparing), Phase::Testing, "Lee", 500).unwrap();

        let acme = list_for(&pool, "c1").unwrap();
        assert_eq!(acme.len(), 2);
        assert_eq!(acme[0].from_phase, Some(Phase::Preparing));
        assert_eq!(acme[0].to_phase, Phase::Testing);
        assert_eq!(acme[0].changed_by, "Lee");
        assert_eq!(acme[1].from_phase, None);

        assert!(list_for(&pool, "missing").unwrap().is_empty());
        assert_eq!(get_recent(&pool, 10).unwrap().len(), 3);
    }

    #[test]
    fn test_cap_drops_oldest_globally() {
        let pool = init_test_db().unwrap();
        for i in 0..6 {
            let id = format!("c{i}");
            insert(&pool, &id, "Client", None, Phase::Preparing, "Dana", 4).unwrap();
        }
        assert_eq!(count(&pool).unwrap(), 4);
        assert!(list_for(&pool, "c0").unwrap().is_empty());
        assert!(list_for(&pool, "c1").unwrap().is_empty());
        assert_eq!(list_for(&pool, "c5").unwrap().len(), 1);
    }

    #[test]
    fn test_trim_sweep() {
        let pool = init_test_db().unwrap();
        for _ in 0..5 {
            insert(&pool, "c1", "Acme", None, Phase::Preparing, "Dana", 500).unwrap();
        }
        assert_eq!(trim(&pool, 2).unwrap(), 3);
        assert_eq!(trim(&pool, 2).unwrap(), 0);
        assert_eq!(count(&pool).unwrap(), 2);
    }
}
