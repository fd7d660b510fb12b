//! Scheduler phase and per-day capacity counters.

use chrono::NaiveDate;

use super::backlog::snap;

/// Lifecycle of a scheduling run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerPhase {
    Initializing,
    Running(NaiveDate),
    Distributing,
    Done,
}

impl SchedulerPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// "Capacity remaining today" per pool per day.
///
/// Seeded from resolved capacity with non-working days forced to zero; only the
/// allocation loop and the redistribution steps draw from it.
#[derive(Clone, Debug)]
pub struct CapacityLedger {
    /// `remaining[pool][day]`
    remaining: Vec<Vec<f64>>,
}

impl CapacityLedger {
    /// Build from per-pool capacity series and a working-day mask.
    pub fn new(capacities: &[&[f64]], working: &[bool]) -> Self {
        let remaining = capacities
            .iter()
            .map(|series| {
                series
                    .iter()
                    .zip(working)
                    .map(|(capacity, works)| if *works { capacity.max(0.0) } else { 0.0 })
                    .collect()
            })
            .collect();
        Self { remaining }
    }

    #[inline]
    pub fn remaining(&self, pool: usize, day: usize) -> f64 {
        self.remaining[pool][day]
    }

    /// Consume up to `amount`, snapping residue; returns what was consumed.
    #[inline]
    pub fn consume(&mut self, pool: usize, day: usize, amount: f64) -> f64 {
        let slot = &mut self.remaining[pool][day];
        let consumed = amount.min(*slot).max(0.0);
        *slot = snap(*slot - consumed);
        consumed
    }

    #[inline]
    pub fn grant(&mut self, pool: usize, day: usize, amount: f64) {
        self.remaining[pool][day] += amount.max(0.0);
    }

    /// Take everything left for the day.
    pub fn drain(&mut self, pool: usize, day: usize) -> f64 {
        std::mem::take(&mut self.remaining[pool][day])
    }
}
