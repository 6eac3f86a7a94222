use rusqlite::{params, Connection, Row};

use crate::db::models::ActivityEntry;
use crate::db::repos::Audit;
use crate::db::DbPool;
use crate::error::AppError;

pub const ACTION_CREATE: &str = "create";
pub const ACTION_UPDATE: &str = "update";
pub const ACTION_DELETE: &str = "delete";

fn row_to_entry(row: &Row) -> rusqlite::Result<ActivityEntry> {
    Ok(ActivityEntry {
        id: row.get("id")?,
        action: row.get("action")?,
        client_id: row.get("client_id")?,
        message: row.get("message")?,
        actor: row.get("actor")?,
        created_at: row.get("created_at")?,
    })
}

// ---------------------------------------------------------------------------
// Insert (append-only; the only delete path is the retention trim)
// ---------------------------------------------------------------------------

/// Append an entry, then drop everything older than the newest `audit.keep` rows.
pub fn insert(
    pool: &DbPool,
    audit: Audit<'_>,
    action: &str,
    client_id: Option<&str>,
    message: &str,
) -> Result<(), AppError> {
    let conn = pool.get()?;
    let id = uuid::Uuid::new_v4().to_string();
    let now = crate::db::timestamp();
    conn.execute(
        "INSERT INTO activity_log (id, action, client_id, message, actor, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, action, client_id, message, audit.actor, now],
    )?;
    let trimmed = trim_conn(&conn, audit.keep)?;
    if trimmed > 0 {
        tracing::debug!(trimmed, keep = audit.keep, "Trimmed activity log");
    }
    Ok(())
}

fn trim_conn(conn: &Connection, keep: u32) -> Result<usize, AppError> {
    let removed = conn.execute(
        "DELETE FROM activity_log WHERE id NOT IN (
             SELECT id FROM activity_log ORDER BY created_at DESC, rowid DESC LIMIT ?1
         )",
        params![keep],
    )?;
    Ok(removed)
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Most recent entries, newest first.
pub fn get_recent(pool: &DbPool, limit: u32) -> Result<Vec<ActivityEntry>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM activity_log ORDER BY created_at DESC, rowid DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], row_to_entry)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn count(pool: &DbPool) -> Result<i64, AppError> {
    let conn = pool.get()?;
    let n = conn.query_row("SELECT COUNT(*) FROM activity_log", [], |row| row.get(0))?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;

    fn audit(keep: u32) -> Audit<'static> {
        Audit { actor: "Tester", keep }
    }

    #[test]
    fn test_insert_and_read_newest_first() {
        let pool = init_test_db().unwrap();
        insert(&pool, audit(100), ACTION_CREATE, Some("c1"), "Created client Acme").unwrap();
        insert(&pool, audit(100), ACTION_UPDATE, Some("c1"), "Updated client Acme").unwrap();

        let recent = get_recent(&pool, 10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].action, ACTION_UPDATE);
        assert_eq!(recent[1].action, ACTION_CREATE);
        assert_eq!(recent[0].actor, "Tester");
        assert_eq!(recent[0].client_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_cap_trims_oldest_first() {
        let pool = init_test_db().unwrap();
        for i in 0..7 {
            insert(&pool, audit(5), ACTION_UPDATE, None, &format!("entry {i}")).unwrap();
        }
        assert_eq!(count(&pool).unwrap(), 5);

        let recent = get_recent(&pool, 10).unwrap();
        let messages: Vec<&str> = recent.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["entry 6", "entry 5", "entry 4", "entry 3", "entry 2"]);
    }
}
