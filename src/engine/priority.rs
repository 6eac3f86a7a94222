//! Dense per-phase ranking.
//!
//! Ranked phases (`preparing`, `testing`, `running`) are ordered by manual rank
//! when one is pinned, then first-come-first-served on `phase_entered_at`, then
//! insertion order. `booked` keeps the priority it was seeded with.

use std::collections::HashSet;

use crate::db::models::{ClientRecord, Phase};
use crate::db::repos::{activity, clients};
use crate::db::DbPool;
use crate::engine::Session;
use crate::error::AppError;

/// Recompute every ranked phase. Returns the number of priority writes.
pub fn recalculate_all(session: &Session) -> Result<usize, AppError> {
    recalculate(&session.db)
}

/// Pool-level recompute; only rows whose stored priority differs are written.
pub fn recalculate(pool: &DbPool) -> Result<usize, AppError> {
    let mut writes = 0usize;
    for phase in Phase::RANKED {
        let members = clients::get_in_rank_order(pool, phase)?;
        for (idx, client) in members.iter().enumerate() {
            let want = idx as i64 + 1;
            if client.priority != want {
                clients::set_priority(pool, &client.id, want)?;
                writes += 1;
            }
        }
    }
    if writes > 0 {
        tracing::debug!(writes, "Priorities recalculated");
    }
    Ok(writes)
}

/// Seed rank for a client about to join `phase`.
pub fn new_client_priority(pool: &DbPool, phase: Phase) -> Result<i64, AppError> {
    Ok(clients::count_in_phase(pool, phase)? + 1)
}

/// Commit a drag-and-drop order for one phase. `ordered_ids` must list every client
/// currently in `phase` exactly once. The order sticks across later recomputes until
/// a client leaves the phase.
pub fn reorder_phase(
    session: &Session,
    phase: Phase,
    ordered_ids: &[String],
) -> Result<Vec<ClientRecord>, AppError> {
    let members = clients::get_by_phase(&session.db, phase)?;
    let current: HashSet<&str> = members.iter().map(|c| c.id.as_str()).collect();

    let mut seen: HashSet<&str> = HashSet::new();
    for id in ordered_ids {
        if !seen.insert(id.as_str()) {
            return Err(AppError::Validation(format!("Client {id} listed twice")));
        }
        if !current.contains(id.as_str()) {
            return Err(AppError::Validation(format!(
                "Client {id} is not in {}",
                phase.label()
            )));
        }
    }
    if seen.len() != current.len() {
        return Err(AppError::Validation(format!(
            "Reorder must list all {} clients in {}, got {}",
            current.len(),
            phase.label(),
            seen.len()
        )));
    }

    for (idx, id) in ordered_ids.iter().enumerate() {
        clients::set_manual_rank(&session.db, id, idx as i64 + 1)?;
    }
    activity::insert(
        &session.db,
        session.audit(),
        activity::ACTION_UPDATE,
        None,
        &format!("Reordered {} clients in {}", ordered_ids.len(), phase.label()),
    )?;
    tracing::debug!(%phase, count = ordered_ids.len(), "Manual order committed");

    recalculate(&session.db)?;
    clients::get_by_phase(&session.db, phase)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::db::init_test_db;
    use crate::db::models::CreateClientInput;
    use crate::db::repos::Audit;
    use crate::notifications::MemoryNotifier;

    const AUDIT: Audit<'static> = Audit { actor: "Tester", keep: 100 };

    fn session() -> Session {
        Session::new(init_test_db().unwrap(), "Tester", Arc::new(MemoryNotifier::new()))
    }

    fn add(pool: &DbPool, name: &str, phase: Phase) -> ClientRecord {
        clients::create(
            pool,
            CreateClientInput { name: name.into(), phase: Some(phase), ..Default::default() },
            AUDIT,
        )
        .unwrap()
    }

    fn priorities(pool: &DbPool, phase: Phase) -> Vec<(String, i64)> {
        clients::get_by_phase(pool, phase)
            .unwrap()
            .into_iter()
            .map(|c| (c.name, c.priority))
            .collect()
    }

    fn assert_dense(pool: &DbPool) {
        for phase in Phase::RANKED {
            let mut got: Vec<i64> = clients::get_by_phase(pool, phase)
                .unwrap()
                .iter()
                .map(|c| c.priority)
                .collect();
            got.sort_unstable();
            let want: Vec<i64> = (1..=got.len() as i64).collect();
            assert_eq!(got, want, "priorities in {phase} not dense");
        }
    }

    #[test]
    fn test_recalculate_orders_by_entry_time() {
        let s = session();
        let a = add(&s.db, "A", Phase::Testing);
        let b = add(&s.db, "B", Phase::Testing);
        clients::set_priority(&s.db, &a.id, 9).unwrap();
        clients::set_priority(&s.db, &b.id, 9).unwrap();

        assert_eq!(recalculate_all(&s).unwrap(), 2);
        assert_eq!(priorities(&s.db, Phase::Testing), vec![("A".into(), 1), ("B".into(), 2)]);

        // Nothing to do the second time
        assert_eq!(recalculate_all(&s).unwrap(), 0);
    }

    #[test]
    fn test_booked_is_not_recomputed() {
        let s = session();
        let a = add(&s.db, "A", Phase::Booked);
        clients::set_priority(&s.db, &a.id, 7).unwrap();
        recalculate_all(&s).unwrap();
        assert_eq!(clients::get_by_id(&s.db, &a.id).unwrap().priority, 7);
    }

    #[test]
    fn test_new_client_priority_counts_phase() {
        let s = session();
        assert_eq!(new_client_priority(&s.db, Phase::Running).unwrap(), 1);
        add(&s.db, "A", Phase::Running);
        add(&s.db, "B", Phase::Running);
        add(&s.db, "C", Phase::Booked);
        assert_eq!(new_client_priority(&s.db, Phase::Running).unwrap(), 3);
        assert_eq!(new_client_priority(&s.db, Phase::Booked).unwrap(), 2);
    }

    #[test]
    fn test_manual_reorder_is_sticky() {
        let s = session();
        let a = add(&s.db, "A", Phase::Preparing);
        let b = add(&s.db, "B", Phase::Preparing);
        let c = add(&s.db, "C", Phase::Preparing);

        let ordered = reorder_phase(&s, Phase::Preparing, &[c.id.clone(), a.id.clone(), b.id.clone()])
            .unwrap();
        let names: Vec<&str> = ordered.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);

        // An unrelated recompute keeps the manual order
        recalculate_all(&s).unwrap();
        assert_eq!(
            priorities(&s.db, Phase::Preparing),
            vec![("C".into(), 1), ("A".into(), 2), ("B".into(), 3)]
        );

        // Newcomers queue after the pinned clients
        add(&s.db, "D", Phase::Preparing);
        recalculate_all(&s).unwrap();
        assert_eq!(priorities(&s.db, Phase::Preparing).last().unwrap(), &("D".to_string(), 4));
    }

    #[test]
    fn test_reorder_rejects_partial_or_foreign_lists() {
        let s = session();
        let a = add(&s.db, "A", Phase::Preparing);
        let b = add(&s.db, "B", Phase::Preparing);
        let x = add(&s.db, "X", Phase::Running);

        let partial = reorder_phase(&s, Phase::Preparing, &[a.id.clone()]);
        assert!(matches!(partial, Err(AppError::Validation(_))));

        let foreign = reorder_phase(&s, Phase::Preparing, &[a.id.clone(), x.id.clone()]);
        assert!(matches!(foreign, Err(AppError::Validation(_))));

        let dup = reorder_phase(&s, Phase::Preparing, &[a.id.clone(), a.id.clone(), b.id.clone()]);
        assert!(matches!(dup, Err(AppError::Validation(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_priorities_dense_after_recalculate(
            phases in prop::collection::vec(0usize..4, 1..12),
            scramble in prop::collection::vec(-3i64..20, 12),
        ) {
            let s = session();
            let mut ids = Vec::new();
            for (i, p) in phases.iter().enumerate() {
                let c = add(&s.db, &format!("C{i}"), Phase::ALL[*p]);
                ids.push(c.id);
            }
            for (id, bogus) in ids.iter().zip(scramble.iter()) {
                clients::set_priority(&s.db, id, *bogus).unwrap();
            }

            recalculate_all(&s).unwrap();
            assert_dense(&s.db);
        }
    }
}
