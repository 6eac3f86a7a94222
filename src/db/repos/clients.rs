use rusqlite::{params, Row};

use crate::db::models::{
    ClientRecord, CreateClientInput, Phase, UpdateClientInput, DEFAULT_AUTO_SWITCH_DAYS,
    MAX_AUTO_SWITCH_DAYS,
};
use crate::db::repos::{activity, Audit};
use crate::db::{DbPool, SetClause};
use crate::error::AppError;
use crate::validation;

// ── Shared validation helpers ────────────────────────────────────────────────

fn validate_auto_switch_days(v: i64) -> Result<(), AppError> {
    validation::require_at_least("auto_switch_days", v, 1)?;
    if v > MAX_AUTO_SWITCH_DAYS {
        return Err(AppError::Validation(format!(
            "auto_switch_days must be <= {MAX_AUTO_SWITCH_DAYS}"
        )));
    }
    Ok(())
}

fn validate_next_phase_date(v: &str) -> Result<(), AppError> {
    validation::parse_date("next_phase_date", v).map(|_| ())
}

fn validate_package_price(v: f64) -> Result<(), AppError> {
    validation::require_non_negative_amount("package_price", v)
}

fn validate_record(record: &ClientRecord) -> Result<(), AppError> {
    validation::require_non_empty("id", &record.id)?;
    validation::require_non_empty("name", &record.name)?;
    validate_auto_switch_days(record.auto_switch_days)?;
    validation::require_at_least("subscription_usage", record.subscription_usage, 0)?;
    validation::require_at_least("testing_round", record.testing_round, 0)?;
    validation::require_at_least("resubscription_count", record.resubscription_count, 0)?;
    if let Some(ref d) = record.next_phase_date {
        validate_next_phase_date(d)?;
    }
    if let Some(p) = record.package_price {
        validate_package_price(p)?;
    }
    Ok(())
}

/// `today + days` as a `YYYY-MM-DD` string. Fails when `days` is out of range or
/// the result falls outside the calendar.
pub fn auto_switch_due_date(today: chrono::NaiveDate, days: i64) -> Result<String, AppError> {
    validate_auto_switch_days(days)?;
    let due = u64::try_from(days)
        .ok()
        .and_then(|d| today.checked_add_days(chrono::Days::new(d)))
        .ok_or_else(|| {
            AppError::Validation(format!("auto_switch_days {days} overflows the calendar"))
        })?;
    Ok(due.format("%Y-%m-%d").to_string())
}

fn row_to_client(row: &Row) -> rusqlite::Result<ClientRecord> {
    Ok(ClientRecord {
        id: row.get("id")?,
        name: row.get("name")?,
        phase: row.get("phase")?,
        priority: row.get("priority")?,
        manual_rank: row.get("manual_rank")?,
        phase_entered_at: row.get("phase_entered_at")?,
        auto_switch: row.get::<_, i32>("auto_switch")? != 0,
        auto_switch_days: row.get("auto_switch_days")?,
        next_phase_date: row.get("next_phase_date")?,
        subscription_started: row.get::<_, i32>("subscription_started")? != 0,
        subscription_usage: row.get("subscription_usage")?,
        testing_round: row.get("testing_round")?,
        resubscription_count: row.get("resubscription_count")?,
        package_name: row.get("package_name")?,
        package_price: row.get("package_price")?,
        payment_status: row.get("payment_status")?,
        contact_name: row.get("contact_name")?,
        contact_email: row.get("contact_email")?,
        contact_phone: row.get("contact_phone")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Keep decodable rows; a bad row is logged and skipped rather than failing the listing.
fn collect_rows<I>(rows: I) -> Vec<ClientRecord>
where
    I: Iterator<Item = rusqlite::Result<ClientRecord>>,
{
    let mut clients = Vec::new();
    let mut skipped = 0usize;
    for row in rows {
        match row {
            Ok(client) => clients.push(client),
            Err(e) => {
                skipped += 1;
                tracing::warn!(error = %e, "Skipping undecodable client row");
            }
        }
    }
    if skipped > 0 {
        tracing::warn!(skipped, kept = clients.len(), "Client listing degraded");
    }
    clients
}

const PHASE_RANK_SQL: &str =
    "CASE phase WHEN 'booked' THEN 0 WHEN 'preparing' THEN 1 WHEN 'testing' THEN 2 ELSE 3 END";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Every client, grouped by phase in pipeline order, then by priority.
pub fn get_all(pool: &DbPool) -> Result<Vec<ClientRecord>, AppError> {
    let conn = pool.get()?;
    let sql = format!(
        "SELECT * FROM clients ORDER BY {PHASE_RANK_SQL}, priority, phase_entered_at, rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], row_to_client)?;
    Ok(collect_rows(rows))
}

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<ClientRecord, AppError> {
    let conn = pool.get()?;
    conn.query_row("SELECT * FROM clients WHERE id = ?1", params![id], row_to_client)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("Client {id}")),
            other => AppError::Database(other),
        })
}

/// Like `get_by_id`, but absence is `Ok(None)`.
pub fn find(pool: &DbPool, id: &str) -> Result<Option<ClientRecord>, AppError> {
    match get_by_id(pool, id) {
        Ok(client) => Ok(Some(client)),
        Err(AppError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Clients in one phase, in display order.
pub fn get_by_phase(pool: &DbPool, phase: Phase) -> Result<Vec<ClientRecord>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM clients WHERE phase = ?1 ORDER BY priority, phase_entered_at, rowid",
    )?;
    let rows = stmt.query_map(params![phase], row_to_client)?;
    Ok(collect_rows(rows))
}

/// Clients in one phase, in ranking order: manual ranks first, then first-come-first-served
/// on `phase_entered_at`, then insertion order.
pub fn get_in_rank_order(pool: &DbPool, phase: Phase) -> Result<Vec<ClientRecord>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM clients WHERE phase = ?1
         ORDER BY manual_rank IS NULL, manual_rank, phase_entered_at, rowid",
    )?;
    let rows = stmt.query_map(params![phase], row_to_client)?;
    Ok(collect_rows(rows))
}

/// Armed, non-terminal clients whose `next_phase_date` is on or before `today` (`YYYY-MM-DD`).
pub fn get_due_auto_switch(pool: &DbPool, today: &str) -> Result<Vec<ClientRecord>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM clients
         WHERE auto_switch = 1 AND phase <> 'running'
           AND next_phase_date IS NOT NULL AND next_phase_date <= ?1
         ORDER BY next_phase_date, phase_entered_at, rowid",
    )?;
    let rows = stmt.query_map(params![today], row_to_client)?;
    Ok(collect_rows(rows))
}

pub fn count_in_phase(pool: &DbPool, phase: Phase) -> Result<i64, AppError> {
    let conn = pool.get()?;
    let n = conn.query_row(
        "SELECT COUNT(*) FROM clients WHERE phase = ?1",
        params![phase],
        |row| row.get(0),
    )?;
    Ok(n)
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

pub fn create(pool: &DbPool, input: CreateClientInput, audit: Audit<'_>) -> Result<ClientRecord, AppError> {
    validation::require_non_empty("name", &input.name)?;
    if let Some(v) = input.auto_switch_days { validate_auto_switch_days(v)?; }
    if let Some(ref d) = input.next_phase_date { validate_next_phase_date(d)?; }
    if let Some(v) = input.package_price { validate_package_price(v)?; }

    let id = uuid::Uuid::new_v4().to_string();
    let now = crate::db::timestamp();
    let phase = input.phase.unwrap_or(Phase::Preparing);
    let auto_switch = input.auto_switch.unwrap_or(false);
    let auto_switch_days = input.auto_switch_days.unwrap_or(DEFAULT_AUTO_SWITCH_DAYS);
    // A terminal client never carries a switch date.
    let next_phase_date = match input.next_phase_date {
        _ if phase.is_terminal() => None,
        Some(d) => Some(d.trim().to_string()),
        None if auto_switch => Some(auto_switch_due_date(
            chrono::Utc::now().date_naive(),
            auto_switch_days,
        )?),
        None => None,
    };
    // Seed rank: consistent with the next recompute since this row sorts last.
    let priority = count_in_phase(pool, phase)? + 1;

    {
        let conn = pool.get()?;
        conn.execute(
            "INSERT INTO clients
             (id, name, phase, priority, phase_entered_at, auto_switch, auto_switch_days,
              next_phase_date, package_name, package_price, payment_status,
              contact_name, contact_email, contact_phone, notes, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?5,?5)",
            params![
                id, input.name.trim(), phase, priority, now, auto_switch as i32, auto_switch_days,
                next_phase_date, input.package_name, input.package_price, input.payment_status,
                input.contact_name, input.contact_email, input.contact_phone, input.notes,
            ],
        )?;
    }

    tracing::debug!(client_id = %id, %phase, priority, "Client created");
    activity::insert(
        pool,
        audit,
        activity::ACTION_CREATE,
        Some(&id),
        &format!("Created client {} in {}", input.name.trim(), phase.label()),
    )?;

    get_by_id(pool, &id)
}

pub fn update(
    pool: &DbPool,
    id: &str,
    input: UpdateClientInput,
    audit: Audit<'_>,
) -> Result<ClientRecord, AppError> {
    // Verify exists
    let existing = get_by_id(pool, id)?;

    if let Some(ref name) = input.name { validation::require_non_empty("name", name)?; }
    if let Some(v) = input.auto_switch_days { validate_auto_switch_days(v)?; }
    if let Some(ref d) = input.next_phase_date { validate_next_phase_date(d)?; }
    if let Some(v) = input.package_price { validate_package_price(v)?; }

    // Arming auto-switch without a date schedules one from today.
    let next_phase_date = match (&input.next_phase_date, input.auto_switch) {
        _ if existing.phase.is_terminal() => None,
        (Some(d), _) => Some(d.trim().to_string()),
        (None, Some(true)) if existing.next_phase_date.is_none() => Some(auto_switch_due_date(
            chrono::Utc::now().date_naive(),
            input.auto_switch_days.unwrap_or(existing.auto_switch_days),
        )?),
        _ => None,
    };

    let mut update = SetClause::new();
    update.push("updated_at", crate::db::timestamp());
    push_field!(update, input.name, "name", |v| v.trim().to_string());
    push_field!(update, input.auto_switch, "auto_switch", |v| *v as i32);
    push_field!(update, input.auto_switch_days, "auto_switch_days");
    push_field!(update, next_phase_date, "next_phase_date");
    push_field!(update, input.package_name, "package_name");
    push_field!(update, input.package_price, "package_price");
    push_field!(update, input.payment_status, "payment_status");
    push_field!(update, input.contact_name, "contact_name");
    push_field!(update, input.contact_email, "contact_email");
    push_field!(update, input.contact_phone, "contact_phone");
    push_field!(update, input.notes, "notes");

    {
        let conn = pool.get()?;
        update.execute(&conn, "clients", id)?;
    }

    let name = input.name.as_deref().map(str::trim).unwrap_or(&existing.name);
    activity::insert(
        pool,
        audit,
        activity::ACTION_UPDATE,
        Some(id),
        &format!("Updated client {name}"),
    )?;

    get_by_id(pool, id)
}

/// Upsert by id. Inserts when absent; otherwise overwrites every mutable column and
/// touches `updated_at`. Blank `created_at`/`phase_entered_at` are stamped with now.
pub fn put(pool: &DbPool, record: &ClientRecord, audit: Audit<'_>) -> Result<ClientRecord, AppError> {
    validate_record(record)?;

    let existed = find(pool, &record.id)?.is_some();
    let now = crate::db::timestamp();
    let created_at = if record.created_at.trim().is_empty() { now.clone() } else { record.created_at.clone() };
    let next_phase_date = if record.phase.is_terminal() { None } else { record.next_phase_date.clone() };
    let phase_entered_at = if record.phase_entered_at.trim().is_empty() {
        now.clone()
    } else {
        record.phase_entered_at.clone()
    };

    {
        let conn = pool.get()?;
        conn.execute(
            "INSERT INTO clients
             (id, name, phase, priority, manual_rank, phase_entered_at, auto_switch, auto_switch_days,
              next_phase_date, subscription_started, subscription_usage, testing_round,
              resubscription_count, package_name, package_price, payment_status,
              contact_name, contact_email, contact_phone, notes, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21,?22)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                phase = excluded.phase,
                priority = excluded.priority,
                manual_rank = excluded.manual_rank,
                phase_entered_at = excluded.phase_entered_at,
                auto_switch = excluded.auto_switch,
                auto_switch_days = excluded.auto_switch_days,
                next_phase_date = excluded.next_phase_date,
                subscription_started = excluded.subscription_started,
                subscription_usage = excluded.subscription_usage,
                testing_round = excluded.testing_round,
                resubscription_count = excluded.resubscription_count,
                package_name = excluded.package_name,
                package_price = excluded.package_price,
                payment_status = excluded.payment_status,
                contact_name = excluded.contact_name,
                contact_email = excluded.contact_email,
                contact_phone = excluded.contact_phone,
                notes = excluded.notes,
                updated_at = excluded.updated_at",
            params![
                record.id,
                record.name.trim(),
                record.phase,
                record.priority,
                record.manual_rank,
                phase_entered_at,
                record.auto_switch as i32,
                record.auto_switch_days,
                next_phase_date,
                record.subscription_started as i32,
                record.subscription_usage,
                record.testing_round,
                record.resubscription_count,
                record.package_name,
                record.package_price,
                record.payment_status,
                record.contact_name,
                record.contact_email,
                record.contact_phone,
                record.notes,
                created_at,
                now,
            ],
        )?;
    }

    let (action, verb) = if existed {
        (activity::ACTION_UPDATE, "Updated")
    } else {
        (activity::ACTION_CREATE, "Created")
    };
    activity::insert(
        pool,
        audit,
        action,
        Some(&record.id),
        &format!("{verb} client {} ({})", record.name.trim(), record.phase.label()),
    )?;

    get_by_id(pool, &record.id)
}

/// Remove a client unconditionally. Deleting an absent id is a no-op that returns `false`.
/// History rows are left alone.
pub fn delete(pool: &DbPool, id: &str, audit: Audit<'_>) -> Result<bool, AppError> {
    let existing = find(pool, id)?;
    let rows = {
        let conn = pool.get()?;
        conn.execute("DELETE FROM clients WHERE id = ?1", params![id])?
    };

    let message = match existing {
        Some(ref client) => format!("Deleted client {}", client.name),
        None => format!("Delete requested for unknown client {id}"),
    };
    activity::insert(pool, audit, activity::ACTION_DELETE, Some(id), &message)?;

    Ok(rows > 0)
}

/// Priority write-back used by the assigner. Leaves `updated_at` alone.
pub fn set_priority(pool: &DbPool, id: &str, priority: i64) -> Result<bool, AppError> {
    let conn = pool.get()?;
    let rows = conn.execute(
        "UPDATE clients SET priority = ?1 WHERE id = ?2",
        params![priority, id],
    )?;
    Ok(rows > 0)
}

/// Pin a client's manual rank (and matching priority) after a drag-and-drop reorder.
pub fn set_manual_rank(pool: &DbPool, id: &str, rank: i64) -> Result<bool, AppError> {
    let conn = pool.get()?;
    let now = crate::db::timestamp();
    let rows = conn.execute(
        "UPDATE clients SET manual_rank = ?1, priority = ?1, updated_at = ?2 WHERE id = ?3",
        params![rank, now, id],
    )?;
    Ok(rows > 0)
}
