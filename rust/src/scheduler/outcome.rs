//! Frozen result of a scheduling run.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::interner::TaskKey;

use super::backlog::BacklogEntry;
use super::deadlines::{DeadlineTable, OverdueTask};
use super::roadmap::Roadmap;

/// Effort bookkeeping of one task in one pool.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffortRecord {
    pub initial: f64,
    pub applied: f64,
    pub remaining: f64,
}

impl EffortRecord {
    pub(crate) fn unstarted(effort: f64) -> Self {
        Self {
            initial: effort,
            applied: 0.0,
            remaining: effort,
        }
    }

    pub(crate) fn from_entry(entry: &BacklogEntry) -> Self {
        Self {
            initial: entry.initial,
            applied: entry.applied,
            remaining: entry.remaining,
        }
    }
}

/// Display metadata passed through from pool configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolMetadata {
    pub name: String,
    pub label: String,
    pub color: String,
}

/// Everything a run produced. Read-only once built.
#[derive(Clone, Debug)]
pub struct ScheduleOutcome {
    pub roadmap: Roadmap,
    pub deadlines: DeadlineTable,
    pub overdue: Vec<OverdueTask>,
    pub pools: Vec<PoolMetadata>,
    /// Last day the Running phase processed; `None` if nothing was scheduled
    pub termination_day: Option<NaiveDate>,
    /// Days on which pools claimed more than the total capacity
    pub shortfall_days: Vec<NaiveDate>,
    pub(crate) task_numbers: Vec<String>,
    pub(crate) completions: FxHashMap<(TaskKey, usize), NaiveDate>,
    pub(crate) efforts: FxHashMap<(TaskKey, usize), EffortRecord>,
    pub(crate) remaining_backlog: Vec<usize>,
    pub(crate) backlog_history: Vec<Vec<usize>>,
}

impl ScheduleOutcome {
    fn task_key(&self, task: &str) -> Option<TaskKey> {
        self.task_numbers
            .iter()
            .position(|n| n == task)
            .map(|i| i as TaskKey)
    }

    fn pool_index(&self, pool: &str) -> Option<usize> {
        self.pools.iter().position(|p| p.name == pool)
    }

    fn key_pair(&self, task: &str, pool: &str) -> Option<(TaskKey, usize)> {
        Some((self.task_key(task)?, self.pool_index(pool)?))
    }

    /// Day on which `task` left the backlog of `pool`.
    pub fn completion(&self, task: &str, pool: &str) -> Option<NaiveDate> {
        let key = self.key_pair(task, pool)?;
        self.completions.get(&key).copied()
    }

    pub fn effort(&self, task: &str, pool: &str) -> Option<EffortRecord> {
        let key = self.key_pair(task, pool)?;
        self.efforts.get(&key).copied()
    }

    pub fn applied_effort(&self, task: &str, pool: &str) -> Option<f64> {
        self.effort(task, pool).map(|e| e.applied)
    }

    pub fn remaining_effort(&self, task: &str, pool: &str) -> Option<f64> {
        self.effort(task, pool).map(|e| e.remaining)
    }

    /// Entries left in the backlog of `pool` when the run ended.
    pub fn remaining_backlog(&self, pool: &str) -> Option<usize> {
        self.pool_index(pool).map(|i| self.remaining_backlog[i])
    }

    /// Backlog size of `pool` at the end of every Running day.
    pub fn backlog_history(&self, pool: &str) -> Option<&[usize]> {
        self.pool_index(pool).map(|i| self.backlog_history[i].as_slice())
    }

    /// All completions as `(task, pool, date)`, in plan then pool order.
    pub fn completions(&self) -> Vec<(String, String, NaiveDate)> {
        let mut rows = Vec::with_capacity(self.completions.len());
        for (key, number) in self.task_numbers.iter().enumerate() {
            for (pool_index, pool) in self.pools.iter().enumerate() {
                if let Some(date) = self.completions.get(&(key as TaskKey, pool_index)) {
                    rows.push((number.clone(), pool.name.clone(), *date));
                }
            }
        }
        rows
    }

    /// Every task finished in every pool it was assigned to.
    pub fn is_fully_scheduled(&self) -> bool {
        self.remaining_backlog.iter().all(|n| *n == 0)
    }
}
