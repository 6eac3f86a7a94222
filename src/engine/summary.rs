use serde::Serialize;
use ts_rs::TS;

use crate::db::models::{ClientRecord, Phase};
use crate::db::repos::{clients, settings};
use crate::db::settings_keys::LAST_AUTO_SWITCH_SWEEP;
use crate::db::DbPool;
use crate::error::AppError;

/// One board column.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct PhaseColumn {
    pub phase: Phase,
    pub count: usize,
    pub clients: Vec<ClientRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct PhaseCounts {
    pub booked: usize,
    pub preparing: usize,
    pub testing: usize,
    pub running: usize,
}

impl PhaseCounts {
    fn bump(&mut self, phase: Phase) {
        match phase {
            Phase::Booked => self.booked += 1,
            Phase::Preparing => self.preparing += 1,
            Phase::Testing => self.testing += 1,
            Phase::Running => self.running += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct PipelineStats {
    pub by_phase: PhaseCounts,
    pub total: usize,
    pub auto_switch_armed: usize,
    /// Armed clients the next sweep would advance.
    pub due: usize,
    pub last_sweep: Option<String>,
}

/// All four columns in pipeline order, each sorted by priority.
pub fn board(pool: &DbPool) -> Result<Vec<PhaseColumn>, AppError> {
    let all = clients::get_all(pool)?;
    let mut columns: Vec<PhaseColumn> = Phase::ALL
        .into_iter()
        .map(|phase| PhaseColumn { phase, count: 0, clients: Vec::new() })
        .collect();

    for client in all {
        let col = &mut columns[client.phase.rank() as usize];
        col.count += 1;
        col.clients.push(client);
    }
    Ok(columns)
}

/// Headline numbers as of `today` (`YYYY-MM-DD`).
pub fn stats(pool: &DbPool, today: &str) -> Result<PipelineStats, AppError> {
    let all = clients::get_all(pool)?;
    let mut by_phase = PhaseCounts::default();
    let mut armed = 0usize;
    let mut due = 0usize;

    for client in &all {
        by_phase.bump(client.phase);
        if client.auto_switch {
            armed += 1;
            if client.next_phase_date.as_deref().is_some_and(|d| d <= today) {
                due += 1;
            }
        }
    }

    Ok(PipelineStats {
        by_phase,
        total: all.len(),
        auto_switch_armed: armed,
        due,
        last_sweep: settings::get(pool, LAST_AUTO_SWITCH_SWEEP)?,
    })
}
