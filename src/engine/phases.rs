//! Phase transitions for client records.
//!
//! The pipeline is linear, `booked -> preparing -> testing -> running`, and `running`
//! is terminal. Every applied transition persists the record, appends one history
//! entry and recomputes priorities. These three steps are separate writes; a failure
//! part way is returned as `Err` with whatever already landed left in place.

use chrono::{NaiveDate, Utc};

use crate::db::models::{ClientRecord, CreateClientInput, Phase, UpdateClientInput};
use crate::db::repos::{clients, history, settings};
use crate::db::settings_keys::LAST_AUTO_SWITCH_SWEEP;
use crate::engine::priority;
use crate::engine::{Session, SkipReason, SweepReport, Transition};
use crate::error::AppError;
use crate::notifications;

/// How entering `testing` treats the subscription counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    /// Forward step: usage always restarts, round kept when already subscribed.
    Advance,
    /// Arbitrary jump or drop: counters reset only on the first ever entry.
    Jump,
}

pub fn next_phase(phase: Phase) -> Option<Phase> {
    phase.next()
}

pub fn previous_phase(phase: Phase) -> Option<Phase> {
    phase.previous()
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Emit the single warning for a soft failure and wrap it.
fn skip(session: &Session, reason: SkipReason, subject: Option<&str>) -> Transition {
    let message = match subject {
        Some(name) => format!("{name}: {reason}"),
        None => reason.to_string(),
    };
    tracing::warn!(actor = %session.actor, ?reason, "Pipeline operation skipped");
    notifications::warning(session.notifier(), message);
    Transition::Skipped(reason)
}

/// Stamp "now", never earlier than the previous stamp.
fn entry_stamp(previous: &str) -> String {
    let now = crate::db::timestamp();
    if previous > now.as_str() {
        previous.to_string()
    } else {
        now
    }
}

fn apply_phase_change(
    session: &Session,
    mut client: ClientRecord,
    target: Phase,
    entry: Entry,
    today: NaiveDate,
) -> Result<ClientRecord, AppError> {
    let from = client.phase;

    client.phase = target;
    client.phase_entered_at = entry_stamp(&client.phase_entered_at);
    client.manual_rank = None;
    client.priority = priority::new_client_priority(&session.db, target)?;

    if target == Phase::Testing {
        match entry {
            Entry::Advance => {
                client.subscription_usage = 0;
                if !client.subscription_started || client.testing_round < 1 {
                    client.testing_round = 1;
                }
                client.subscription_started = true;
            }
            Entry::Jump => {
                if !client.subscription_started {
                    client.subscription_started = true;
                    client.subscription_usage = 0;
                    client.testing_round = 1;
                }
            }
        }
    }

    if client.auto_switch {
        client.next_phase_date = if target.is_terminal() {
            None
        } else {
            Some(clients::auto_switch_due_date(today, client.auto_switch_days)?)
        };
    }

    let stored = clients::put(&session.db, &client, session.audit())?;
    history::insert(
        &session.db,
        &stored.id,
        &stored.name,
        Some(from),
        target,
        &session.actor,
        session.history_cap,
    )?;
    priority::recalculate_all(session)?;

    tracing::info!(client_id = %stored.id, %from, to = %target, actor = %session.actor, "Phase changed");
    clients::get_by_id(&session.db, &stored.id)
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Create a client, log its entry into the pipeline, and rerank.
pub fn create_client(session: &Session, input: CreateClientInput) -> Result<ClientRecord, AppError> {
    let client = clients::create(&session.db, input, session.audit())?;
    history::insert(
        &session.db,
        &client.id,
        &client.name,
        None,
        client.phase,
        &session.actor,
        session.history_cap,
    )?;
    priority::recalculate_all(session)?;
    notifications::success(
        session.notifier(),
        format!("Added {} to {}", client.name, client.phase.label()),
    );
    clients::get_by_id(&session.db, &client.id)
}

/// Edit descriptive fields. Unknown id is a soft failure.
pub fn update_client(
    session: &Session,
    id: &str,
    input: UpdateClientInput,
) -> Result<Transition, AppError> {
    if clients::find(&session.db, id)?.is_none() {
        return Ok(skip(session, SkipReason::NotFound(id.to_string()), None));
    }
    let client = clients::update(&session.db, id, input, session.audit())?;
    notifications::success(session.notifier(), format!("Saved {}", client.name));
    Ok(Transition::Applied(client))
}

/// Remove a client from the store. History stays. Returns the record as it was.
pub fn archive_client(session: &Session, id: &str) -> Result<Transition, AppError> {
    let Some(client) = clients::find(&session.db, id)? else {
        return Ok(skip(session, SkipReason::NotFound(id.to_string()), None));
    };
    clients::delete(&session.db, id, session.audit())?;
    priority::recalculate_all(session)?;
    notifications::success(session.notifier(), format!("Archived {}", client.name));
    Ok(Transition::Applied(client))
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Advance one step. Soft-fails when the client is missing or already `running`.
pub fn move_to_next_phase(session: &Session, id: &str) -> Result<Transition, AppError> {
    advance(session, id, today())
}

fn advance(session: &Session, id: &str, today: NaiveDate) -> Result<Transition, AppError> {
    let Some(client) = clients::find(&session.db, id)? else {
        return Ok(skip(session, SkipReason::NotFound(id.to_string()), None));
    };
    let Some(target) = client.phase.next() else {
        let name = client.name.clone();
        return Ok(skip(session, SkipReason::Terminal, Some(&name)));
    };

    let updated = apply_phase_change(session, client, target, Entry::Advance, today)?;
    notifications::success(
        session.notifier(),
        format!("Moved {} to {}", updated.name, target.label()),
    );
    Ok(Transition::Applied(updated))
}

/// Jump to any phase, adjacent or not.
pub fn move_to_phase(session: &Session, id: &str, target: Phase) -> Result<Transition, AppError> {
    jump(session, id, target, false)
}

/// `move_to_phase` for a target given by name; names outside the four phases are rejected.
pub fn move_to_phase_named(session: &Session, id: &str, target: &str) -> Result<Transition, AppError> {
    match Phase::parse(target) {
        Some(phase) => move_to_phase(session, id, phase),
        None => Ok(skip(session, SkipReason::UnknownPhase(target.to_string()), None)),
    }
}

/// Cross-column drop from the board. Same as `move_to_phase`, and landing in
/// `preparing` from another phase counts as a resubscription.
pub fn drop_into_phase(session: &Session, id: &str, target: Phase) -> Result<Transition, AppError> {
    jump(session, id, target, true)
}

fn jump(session: &Session, id: &str, target: Phase, from_drop: bool) -> Result<Transition, AppError> {
    let Some(mut client) = clients::find(&session.db, id)? else {
        return Ok(skip(session, SkipReason::NotFound(id.to_string()), None));
    };
    if client.phase == target {
        let name = client.name.clone();
        return Ok(skip(session, SkipReason::AlreadyInPhase(target), Some(&name)));
    }

    if from_drop && target == Phase::Preparing {
        client.resubscription_count += 1;
    }

    let updated = apply_phase_change(session, client, target, Entry::Jump, today())?;
    notifications::success(
        session.notifier(),
        format!("Moved {} to {}", updated.name, target.label()),
    );
    Ok(Transition::Applied(updated))
}

/// Start another testing round: round + 1, usage back to zero. Only valid in `testing`.
pub fn start_new_testing_round(session: &Session, id: &str) -> Result<Transition, AppError> {
    let Some(mut client) = clients::find(&session.db, id)? else {
        return Ok(skip(session, SkipReason::NotFound(id.to_string()), None));
    };
    if client.phase != Phase::Testing {
        let name = client.name.clone();
        return Ok(skip(session, SkipReason::NotInTesting, Some(&name)));
    }

    client.testing_round += 1;
    client.subscription_usage = 0;
    let stored = clients::put(&session.db, &client, session.audit())?;
    priority::recalculate_all(session)?;

    notifications::success(
        session.notifier(),
        format!("Started testing round {} for {}", stored.testing_round, stored.name),
    );
    Ok(Transition::Applied(clients::get_by_id(&session.db, id)?))
}

/// Add to the current round's usage counter. Only valid in `testing`.
pub fn record_usage(session: &Session, id: &str, amount: i64) -> Result<Transition, AppError> {
    crate::validation::require_at_least("amount", amount, 0)?;
    let Some(mut client) = clients::find(&session.db, id)? else {
        return Ok(skip(session, SkipReason::NotFound(id.to_string()), None));
    };
    if client.phase != Phase::Testing {
        let name = client.name.clone();
        return Ok(skip(session, SkipReason::NotInTesting, Some(&name)));
    }

    client.subscription_usage += amount;
    let stored = clients::put(&session.db, &client, session.audit())?;
    Ok(Transition::Applied(stored))
}

// ---------------------------------------------------------------------------
// Auto-switch sweep
// ---------------------------------------------------------------------------

/// Advance every armed client whose `next_phase_date` is today or earlier.
pub fn process_auto_switches(session: &Session) -> Result<SweepReport, AppError> {
    process_auto_switches_as_of(session, today())
}

pub fn process_auto_switches_as_of(
    session: &Session,
    today: NaiveDate,
) -> Result<SweepReport, AppError> {
    let as_of = today.format("%Y-%m-%d").to_string();
    let due = clients::get_due_auto_switch(&session.db, &as_of)?;

    let mut report = SweepReport {
        as_of: as_of.clone(),
        due: due.len(),
        ..SweepReport::default()
    };

    for client in &due {
        match advance(session, &client.id, today)? {
            Transition::Applied(_) => report.advanced += 1,
            Transition::Skipped(_) => report.skipped += 1,
        }
    }

    settings::set(&session.db, LAST_AUTO_SWITCH_SWEEP, &as_of)?;
    if report.due > 0 {
        tracing::info!(as_of = %as_of, advanced = report.advanced, skipped = report.skipped, "Auto-switch sweep complete");
    } else {
        tracing::debug!(as_of = %as_of, "Auto-switch sweep found nothing due");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::init_test_db;
    use crate::notifications::{MemoryNotifier, NoticeLevel};

    fn setup() -> (Session, Arc<MemoryNotifier>) {
        let sink = Arc::new(MemoryNotifier::new());
        let session = Session::new(init_test_db().unwrap(), "Dana", sink.clone());
        (session, sink)
    }

    fn add(session: &Session, name: &str, phase: Phase) -> ClientRecord {
        create_client(
            session,
            CreateClientInput { name: name.into(), phase: Some(phase), ..Default::default() },
        )
        .unwrap()
    }

    fn reload(session: &Session, id: &str) -> ClientRecord {
        clients::get_by_id(&session.db, id).unwrap()
    }

    #[test]
    fn test_phase_lookups() {
        assert_eq!(next_phase(Phase::Testing), Some(Phase::Running));
        assert_eq!(next_phase(Phase::Running), None);
        assert_eq!(previous_phase(Phase::Booked), None);
        assert_eq!(previous_phase(Phase::Preparing), Some(Phase::Booked));
    }

    #[test]
    fn test_preparing_pair_then_advance() {
        let (s, _) = setup();
        let a = add(&s, "A", Phase::Preparing);
        let b = add(&s, "B", Phase::Preparing);
        assert_eq!(a.priority, 1);
        assert_eq!(b.priority, 2);

        let moved = move_to_next_phase(&s, &a.id).unwrap().into_client().unwrap();
        assert_eq!(moved.phase, Phase::Testing);
        assert_eq!(moved.priority, 1);

        let entries = history::list_for(&s.db, &a.id).unwrap();
        assert_eq!(entries[0].from_phase, Some(Phase::Preparing));
        assert_eq!(entries[0].to_phase, Phase::Testing);
        assert_eq!(entries[0].changed_by, "Dana");
        assert_eq!(entries[1].from_phase, None);

        assert_eq!(reload(&s, &b.id).priority, 1);
    }

    #[test]
    fn test_new_testing_round() {
        let (s, _) = setup();
        let c = add(&s, "C", Phase::Testing);
        let mut seeded = reload(&s, &c.id);
        seeded.testing_round = 2;
        seeded.subscription_usage = 55;
        seeded.subscription_started = true;
        clients::put(&s.db, &seeded, s.audit()).unwrap();

        let after = start_new_testing_round(&s, &c.id).unwrap().into_client().unwrap();
        assert_eq!(after.testing_round, 3);
        assert_eq!(after.subscription_usage, 0);
        assert_eq!(after.phase, Phase::Testing);
    }

    #[test]
    fn test_terminal_advance_is_a_single_warning() {
        let (s, sink) = setup();
        let d = add(&s, "D", Phase::Running);
        let before = reload(&s, &d.id);
        sink.take();

        let result = move_to_next_phase(&s, &d.id).unwrap();
        assert_eq!(result, Transition::Skipped(SkipReason::Terminal));
        assert_eq!(reload(&s, &d.id), before);
        assert_eq!(sink.count(NoticeLevel::Warning), 1);
        assert_eq!(sink.notices().len(), 1);
        assert_eq!(history::list_for(&s.db, &d.id).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_client_is_soft() {
        let (s, sink) = setup();
        for result in [
            move_to_next_phase(&s, "nope").unwrap(),
            move_to_phase(&s, "nope", Phase::Testing).unwrap(),
            drop_into_phase(&s, "nope", Phase::Preparing).unwrap(),
            start_new_testing_round(&s, "nope").unwrap(),
            archive_client(&s, "nope").unwrap(),
        ] {
            assert_eq!(result, Transition::Skipped(SkipReason::NotFound("nope".into())));
        }
        assert_eq!(sink.count(NoticeLevel::Warning), 5);
        assert_eq!(sink.notices()[0].message, "Client nope not found");
    }

    #[test]
    fn test_round_rejected_outside_testing() {
        let (s, sink) = setup();
        let a = add(&s, "A", Phase::Preparing);
        sink.take();
        let result = start_new_testing_round(&s, &a.id).unwrap();
        assert_eq!(result, Transition::Skipped(SkipReason::NotInTesting));
        assert_eq!(sink.notices()[0].message, "A: not in the testing phase");
        assert_eq!(reload(&s, &a.id).testing_round, 0);
    }

    #[test]
    fn test_first_testing_entry_resets_usage() {
        let (s, _) = setup();
        let a = add(&s, "A", Phase::Preparing);
        let mut dirty = reload(&s, &a.id);
        dirty.subscription_usage = 40;
        clients::put(&s.db, &dirty, s.audit()).unwrap();

        let moved = move_to_phase(&s, &a.id, Phase::Testing).unwrap().into_client().unwrap();
        assert!(moved.subscription_started);
        assert_eq!(moved.subscription_usage, 0);
        assert_eq!(moved.testing_round, 1);
    }

    #[test]
    fn test_reentering_testing_by_jump_keeps_counters() {
        let (s, _) = setup();
        let a = add(&s, "A", Phase::Testing);
        move_to_phase(&s, &a.id, Phase::Preparing).unwrap();
        let mut mid = reload(&s, &a.id);
        mid.subscription_started = true;
        mid.testing_round = 2;
        mid.subscription_usage = 30;
        clients::put(&s.db, &mid, s.audit()).unwrap();

        let back = move_to_phase(&s, &a.id, Phase::Testing).unwrap().into_client().unwrap();
        assert_eq!(back.testing_round, 2);
        assert_eq!(back.subscription_usage, 30);
    }

    #[test]
    fn test_advance_into_testing_keeps_round_resets_usage() {
        let (s, _) = setup();
        let a = add(&s, "A", Phase::Preparing);
        let mut mid = reload(&s, &a.id);
        mid.subscription_started = true;
        mid.testing_round = 3;
        mid.subscription_usage = 12;
        clients::put(&s.db, &mid, s.audit()).unwrap();

        let moved = move_to_next_phase(&s, &a.id).unwrap().into_client().unwrap();
        assert_eq!(moved.testing_round, 3);
        assert_eq!(moved.subscription_usage, 0);
    }

    #[test]
    fn test_entry_stamp_is_monotonic() {
        let (s, _) = setup();
        let a = add(&s, "A", Phase::Booked);
        let before = reload(&s, &a.id).phase_entered_at;
        let moved = move_to_next_phase(&s, &a.id).unwrap().into_client().unwrap();
        assert!(moved.phase_entered_at >= before);

        // A stamp from the future is never moved backwards.
        let mut future = moved.clone();
        future.phase_entered_at = "2999-01-01T00:00:00.000000Z".into();
        clients::put(&s.db, &future, s.audit()).unwrap();
        let again = move_to_next_phase(&s, &a.id).unwrap().into_client().unwrap();
        assert_eq!(again.phase_entered_at, "2999-01-01T00:00:00.000000Z");
    }

    #[test]
    fn test_unknown_and_same_phase_targets() {
        let (s, sink) = setup();
        let a = add(&s, "A", Phase::Preparing);
        sink.take();

        let unknown = move_to_phase_named(&s, &a.id, "archived").unwrap();
        assert_eq!(unknown, Transition::Skipped(SkipReason::UnknownPhase("archived".into())));
        assert_eq!(sink.notices()[0].message, "Unknown phase 'archived'");

        let same = move_to_phase_named(&s, &a.id, "Preparing").unwrap();
        assert_eq!(same, Transition::Skipped(SkipReason::AlreadyInPhase(Phase::Preparing)));
        assert_eq!(sink.count(NoticeLevel::Warning), 2);

        let jumped = move_to_phase_named(&s, &a.id, "running").unwrap();
        assert_eq!(jumped.client().unwrap().phase, Phase::Running);
    }

    #[test]
    fn test_drop_into_preparing_counts_resubscription() {
        let (s, _) = setup();
        let a = add(&s, "A", Phase::Running);

        let dropped = drop_into_phase(&s, &a.id, Phase::Preparing).unwrap().into_client().unwrap();
        assert_eq!(dropped.phase, Phase::Preparing);
        assert_eq!(dropped.resubscription_count, 1);

        let to_testing = drop_into_phase(&s, &a.id, Phase::Testing).unwrap().into_client().unwrap();
        assert_eq!(to_testing.resubscription_count, 1);

        // Plain moves never count
        let moved = move_to_phase(&s, &a.id, Phase::Preparing).unwrap().into_client().unwrap();
        assert_eq!(moved.resubscription_count, 1);
    }

    #[test]
    fn test_phase_change_clears_manual_rank() {
        let (s, _) = setup();
        let a = add(&s, "A", Phase::Preparing);
        let b = add(&s, "B", Phase::Preparing);
        priority::reorder_phase(&s, Phase::Preparing, &[b.id.clone(), a.id.clone()]).unwrap();
        assert_eq!(reload(&s, &b.id).manual_rank, Some(1));

        let moved = move_to_next_phase(&s, &b.id).unwrap().into_client().unwrap();
        assert_eq!(moved.manual_rank, None);
        assert_eq!(reload(&s, &a.id).priority, 1);
    }

    #[test]
    fn test_never_beyond_running() {
        let (s, _) = setup();
        let a = add(&s, "A", Phase::Booked);
        for _ in 0..6 {
            move_to_next_phase(&s, &a.id).unwrap();
        }
        assert_eq!(reload(&s, &a.id).phase, Phase::Running);
        let transitions = history::list_for(&s.db, &a.id).unwrap();
        assert_eq!(transitions.len(), 4);
    }

    #[test]
    fn test_auto_switch_sweep() {
        let (s, _) = setup();
        let today = NaiveDate::from_ymd_opt(2026, 5, 10).unwrap();

        let due = create_client(
            &s,
            CreateClientInput {
                name: "Due".into(),
                phase: Some(Phase::Preparing),
                auto_switch: Some(true),
                auto_switch_days: Some(5),
                next_phase_date: Some("2026-05-10".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let later = create_client(
            &s,
            CreateClientInput {
                name: "Later".into(),
                auto_switch: Some(true),
                next_phase_date: Some("2026-05-11".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let off = create_client(
            &s,
            CreateClientInput {
                name: "Off".into(),
                next_phase_date: Some("2026-01-01".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let report = process_auto_switches_as_of(&s, today).unwrap();
        assert_eq!(report.due, 1);
        assert_eq!(report.advanced, 1);
        assert_eq!(report.skipped, 0);

        let advanced = reload(&s, &due.id);
        assert_eq!(advanced.phase, Phase::Testing);
        assert_eq!(advanced.next_phase_date.as_deref(), Some("2026-05-15"));
        assert_eq!(reload(&s, &later.id).phase, Phase::Preparing);
        assert_eq!(reload(&s, &off.id).phase, Phase::Preparing);

        assert_eq!(
            settings::get(&s.db, LAST_AUTO_SWITCH_SWEEP).unwrap().as_deref(),
            Some("2026-05-10")
        );

        // Same day again: the new date is in the future, nothing moves.
        let again = process_auto_switches_as_of(&s, today).unwrap();
        assert_eq!(again.due, 0);
    }

    #[test]
    fn test_auto_switch_into_running_clears_date() {
        let (s, _) = setup();
        let c = create_client(
            &s,
            CreateClientInput {
                name: "C".into(),
                phase: Some(Phase::Testing),
                auto_switch: Some(true),
                next_phase_date: Some("2026-05-01".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let today = NaiveDate::from_ymd_opt(2026, 5, 2).unwrap();
        let report = process_auto_switches_as_of(&s, today).unwrap();
        assert_eq!(report.advanced, 1);

        let running = reload(&s, &c.id);
        assert_eq!(running.phase, Phase::Running);
        assert_eq!(running.next_phase_date, None);
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(16))]

        #[test]
        fn prop_advancing_saturates_at_running(start in 0usize..4, steps in 0usize..7) {
            let (s, sink) = setup();
            let c = add(&s, "C", Phase::ALL[start]);
            sink.take();
            for _ in 0..steps {
                move_to_next_phase(&s, &c.id).unwrap();
            }
            let expected = Phase::ALL[(start + steps).min(3)];
            proptest::prop_assert_eq!(reload(&s, &c.id).phase, expected);

            let overshoot = (start + steps).saturating_sub(3);
            proptest::prop_assert_eq!(sink.count(NoticeLevel::Warning), overshoot);
        }
    }

    #[test]
    fn test_out_of_range_interval_is_rejected_not_fatal() {
        let (s, _) = setup();
        let result = create_client(
            &s,
            CreateClientInput {
                name: "Acme".into(),
                auto_switch: Some(true),
                auto_switch_days: Some(100_000_000),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_sweep_ignores_running_clients() {
        let (s, sink) = setup();
        let c = create_client(
            &s,
            CreateClientInput {
                name: "Done".into(),
                phase: Some(Phase::Running),
                auto_switch: Some(true),
                next_phase_date: Some("2026-01-01".into()),
                ..Default::default()
            },
        )
        .unwrap();
        s.db.get()
            .unwrap()
            .execute(
                "UPDATE clients SET next_phase_date = '2026-01-01' WHERE id = ?1",
                [&c.id],
            )
            .unwrap();
        sink.take();

        let today = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        for _ in 0..2 {
            let report = process_auto_switches_as_of(&s, today).unwrap();
            assert_eq!(report.due, 0);
            assert_eq!(report.skipped, 0);
        }
        assert_eq!(sink.count(NoticeLevel::Warning), 0);
        assert_eq!(reload(&s, &c.id).phase, Phase::Running);
    }

    #[test]
    fn test_record_usage() {
        let (s, _) = setup();
        let t = add(&s, "T", Phase::Testing);
        let p = add(&s, "P", Phase::Preparing);

        let used = record_usage(&s, &t.id, 7).unwrap().into_client().unwrap();
        assert_eq!(used.subscription_usage, 7);
        assert_eq!(
            record_usage(&s, &p.id, 1).unwrap(),
            Transition::Skipped(SkipReason::NotInTesting)
        );
        assert!(matches!(record_usage(&s, &t.id, -1), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_archive_keeps_history_and_reranks() {
        let (s, _) = setup();
        let a = add(&s, "A", Phase::Running);
        let b = add(&s, "B", Phase::Running);

        let archived = archive_client(&s, &a.id).unwrap();
        assert_eq!(archived.client().unwrap().name, "A");
        assert!(clients::find(&s.db, &a.id).unwrap().is_none());
        assert_eq!(history::list_for(&s.db, &a.id).unwrap().len(), 1);
        assert_eq!(reload(&s, &b.id).priority, 1);
    }

    #[test]
    fn test_update_client_soft_on_missing() {
        let (s, _) = setup();
        let result = update_client(&s, "ghost", UpdateClientInput::default()).unwrap();
        assert!(!result.is_applied());

        let a = add(&s, "A", Phase::Booked);
        let saved = update_client(
            &s,
            &a.id,
            UpdateClientInput { payment_status: Some("paid".into()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(saved.client().unwrap().payment_status.as_deref(), Some("paid"));
    }
}
