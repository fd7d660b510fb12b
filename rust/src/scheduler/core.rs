//! Day-by-day forward scheduler.
//!
//! Walks the timeline one day at a time. On each day every pool with work left
//! runs the single-day allocation loop, unclaimed capacity is redistributed to
//! absorbing pools which then get a second pass, and yielding pools hand what
//! they still hold to the `unused` column. Once the timeline ends or every
//! backlog is empty, the remaining surplus is distributed and the run is done.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::config::{BlockingPolicy, ConfigError};
use crate::interner::{TaskKey, TaskKeyInterner};
use crate::models::Plan;
use crate::pool::ResolvedParameters;
use crate::timeline::Timeline;
use crate::{log_changes, log_checks, log_debug, log_warn};

use super::backlog::{Backlog, BacklogEntry};
use super::deadlines::{aggregate_deadlines, overdue_tasks};
use super::outcome::{EffortRecord, PoolMetadata, ScheduleOutcome};
use super::roadmap::{Roadmap, UNUSED_COLUMN};
use super::state::{CapacityLedger, SchedulerPhase};

/// Errors that can occur while setting up a scheduling run.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Series {series} has {len} values but the timeline has {expected} days")]
    SeriesLength {
        series: String,
        len: usize,
        expected: usize,
    },
}

/// A pool as the scheduler sees it: resolved series plus policy flags.
#[derive(Clone, Debug)]
pub struct PoolSnapshot {
    pub name: String,
    pub label: String,
    pub color: String,
    pub params: ResolvedParameters,
    pub absorbs_surplus: bool,
    pub yields_unused: bool,
}

/// Run-wide knobs that do not belong to a single pool.
#[derive(Clone, Debug, Default)]
pub struct SchedulerOptions {
    pub holidays: Vec<NaiveDate>,
    pub show_unused: bool,
    pub blocking_policy: BlockingPolicy,
    pub verbosity: u8,
}

/// Single-run scheduler. Owns the roadmap, backlogs and completion table
/// exclusively until [`Scheduler::run`] hands them out as a [`ScheduleOutcome`].
/// [`Scheduler::step`] advances the same state machine one phase or day at a time.
pub struct Scheduler<'a> {
    plan: &'a Plan,
    timeline: Timeline,
    pools: Vec<PoolSnapshot>,
    options: SchedulerOptions,
    phase: SchedulerPhase,
    /// Next day to schedule; after termination, the first day left to distribute
    day: usize,

    interner: TaskKeyInterner,
    backlogs: Vec<Backlog>,
    /// Per task key: number of backlogs still holding the task
    open_backlogs: Vec<u32>,

    working: Vec<bool>,
    free_surplus: Vec<f64>,
    shortfall_days: Vec<NaiveDate>,
    ledger: CapacityLedger,
    roadmap: Roadmap,
    unused_column: Option<usize>,

    completions: FxHashMap<(TaskKey, usize), NaiveDate>,
    efforts: FxHashMap<(TaskKey, usize), EffortRecord>,
    backlog_history: Vec<Vec<usize>>,
    termination_day: Option<NaiveDate>,
}

impl<'a> Scheduler<'a> {
    /// Build backlogs, capacity counters and the initial roadmap.
    ///
    /// `total_capacity` is the per-day labor available to the whole scenario;
    /// whatever pools do not claim in steady state is surplus.
    pub fn new(
        plan: &'a Plan,
        timeline: Timeline,
        pools: Vec<PoolSnapshot>,
        total_capacity: Vec<f64>,
        options: SchedulerOptions,
    ) -> Result<Self, SchedulerError> {
        plan.validate()?;
        let days = timeline.len();
        check_len("total_capacity", &total_capacity, days)?;
        for pool in &pools {
            let params = &pool.params;
            for (attribute, series) in [
                ("capacity", &params.capacity),
                ("efficiency", &params.efficiency),
                ("parallelizability", &params.parallelizability),
                ("base_cost", &params.base_cost),
            ] {
                check_len(&format!("{}.{}", pool.name, attribute), series, days)?;
            }
        }

        let working = timeline.working_days(&options.holidays);

        // Surplus = total minus every pool's steady-state claim, clamped at zero
        let mut free_surplus = Vec::with_capacity(days);
        let mut shortfall_days = Vec::new();
        for (day, total) in total_capacity.iter().enumerate() {
            let claimed: f64 = pools.iter().map(|p| p.params.steady_state(day)).sum();
            let free = total - claimed;
            if free < 0.0 {
                shortfall_days.push(timeline.date_at(day));
            }
            free_surplus.push(free.max(0.0));
        }
        if let Some(first) = shortfall_days.first() {
            log_warn!(
                "Not enough capacity for all pools on {} day(s) starting {}; surplus clamped to zero",
                shortfall_days.len(),
                first
            );
        }

        let mut interner = TaskKeyInterner::with_capacity(plan.tasks.len());
        for task in &plan.tasks {
            interner.intern(&task.number);
        }

        let mut open_backlogs = vec![0u32; interner.len()];
        let mut efforts = FxHashMap::default();
        let mut backlogs = Vec::with_capacity(pools.len());
        for (pool_index, pool) in pools.iter().enumerate() {
            let mut entries = Vec::new();
            for (task_index, task) in plan.tasks.iter().enumerate() {
                let key = task_index as TaskKey;
                let effort = task.effort(&pool.name);
                if effort <= 0.0 {
                    continue;
                }
                let blockers = task
                    .blocking_pattern(&pool.name)
                    .map(|pattern| {
                        interner
                            .keys_matching(pattern)
                            .into_iter()
                            .filter(|k| *k != key)
                            .collect()
                    })
                    .unwrap_or_default();
                entries.push((BacklogEntry::new(key, effort, blockers), task.priority));
                efforts.insert((key, pool_index), EffortRecord::unstarted(effort));
            }
            let backlog = Backlog::from_prioritized(entries);
            for entry in backlog.entries() {
                open_backlogs[entry.key as usize] += 1;
            }
            backlogs.push(backlog);
        }

        let mut columns: Vec<String> = pools.iter().map(|p| p.name.clone()).collect();
        let unused_column = if options.show_unused || pools.iter().any(|p| p.yields_unused) {
            columns.push(UNUSED_COLUMN.to_string());
            Some(columns.len() - 1)
        } else {
            None
        };
        let mut roadmap = Roadmap::new(timeline, columns);
        for (pool_index, pool) in pools.iter().enumerate() {
            for day in 0..days {
                roadmap.set(pool_index, day, pool.params.steady_state(day));
            }
        }

        let capacities: Vec<&[f64]> = pools.iter().map(|p| p.params.capacity.as_slice()).collect();
        let ledger = CapacityLedger::new(&capacities, &working);

        Ok(Self {
            plan,
            timeline,
            backlog_history: vec![Vec::new(); pools.len()],
            pools,
            options,
            phase: SchedulerPhase::Initializing,
            day: 0,
            interner,
            backlogs,
            open_backlogs,
            working,
            free_surplus,
            shortfall_days,
            ledger,
            roadmap,
            unused_column,
            completions: FxHashMap::default(),
            efforts,
            termination_day: None,
        })
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    /// Advance the run by one step and return the phase it moved to.
    ///
    /// A `Running(date)` phase schedules `date` on the next step. Stepping a
    /// finished run does nothing.
    pub fn step(&mut self) -> SchedulerPhase {
        let verbosity = self.options.verbosity;
        let current = self.phase;
        self.phase = match current {
            SchedulerPhase::Initializing if self.all_backlogs_empty() => {
                log_changes!(verbosity, "Nothing to schedule");
                SchedulerPhase::Distributing
            }
            SchedulerPhase::Initializing => SchedulerPhase::Running(self.timeline.start()),
            SchedulerPhase::Running(date) => {
                self.schedule_day(self.day);
                self.day += 1;
                if self.all_backlogs_empty() || self.day == self.timeline.len() {
                    self.termination_day = Some(date);
                    log_changes!(verbosity, "Finished scheduling at {}", date);
                    SchedulerPhase::Distributing
                } else {
                    SchedulerPhase::Running(self.timeline.date_at(self.day))
                }
            }
            SchedulerPhase::Distributing => {
                self.distribute_remaining(self.day);
                SchedulerPhase::Done
            }
            SchedulerPhase::Done => SchedulerPhase::Done,
        };
        self.phase
    }

    /// Run to completion and hand out the frozen results.
    pub fn run(mut self) -> ScheduleOutcome {
        while !self.phase.is_terminal() {
            self.step();
        }
        self.into_outcome()
    }

    /// One day of the Running phase.
    fn schedule_day(&mut self, day: usize) {
        // First pass, regular capacity
        for pool in 0..self.pools.len() {
            if !self.backlogs[pool].is_empty() {
                self.allocate_day(pool, day);
            }
        }

        // Hand unclaimed capacity to absorbing pools, then let them use it
        let recipients = self.redistribute(day);
        for pool in recipients {
            if !self.backlogs[pool].is_empty() {
                self.allocate_day(pool, day);
            }
        }

        self.collect_yielded(day);

        for (pool, backlog) in self.backlogs.iter().enumerate() {
            self.backlog_history[pool].push(backlog.len());
        }
    }

    fn all_backlogs_empty(&self) -> bool {
        self.backlogs.iter().all(Backlog::is_empty)
    }

    fn is_blocked(&self, entry: &BacklogEntry) -> bool {
        entry
            .blockers
            .iter()
            .any(|key| self.open_backlogs[*key as usize] > 0)
    }

    /// Single-day allocation loop for one pool.
    fn allocate_day(&mut self, pool: usize, day: usize) {
        let verbosity = self.options.verbosity;
        let date = self.timeline.date_at(day);
        let efficiency = self.pools[pool].params.efficiency[day];
        let parallelizability = self.pools[pool].params.parallelizability[day];

        let mut cursor = 0;
        let mut skipped = 0;
        loop {
            let capacity = self.ledger.remaining(pool, day);
            if capacity <= 0.0 {
                break;
            }
            let (key, owed, blocked) = match self.backlogs[pool].get(cursor) {
                Some(entry) => (entry.key, entry.remaining, self.is_blocked(entry)),
                None => break,
            };

            if blocked {
                log_checks!(
                    verbosity,
                    "  {} blocked in {} on {}",
                    self.task_number(key),
                    self.pools[pool].name,
                    date
                );
                match self.options.blocking_policy {
                    BlockingPolicy::HaltPool => break,
                    BlockingPolicy::SkipTask => {
                        skipped += 1;
                        if skipped >= self.backlogs[pool].len() {
                            break;
                        }
                        cursor = self.backlogs[pool].next_cursor(cursor);
                        continue;
                    }
                }
            }
            skipped = 0;

            let rationed = if parallelizability > 0.0 {
                capacity / parallelizability
            } else {
                capacity
            };
            let unit = 1.0_f64.min(rationed).min(owed).min(capacity);
            self.ledger.consume(pool, day, unit);
            let remaining = self.backlogs[pool].apply(cursor, efficiency * unit);
            log_debug!(
                verbosity,
                "  {} {}: unit {:.3}, remaining {:.3}",
                date,
                self.task_number(key),
                unit,
                remaining
            );

            if remaining == 0.0 {
                self.complete(pool, cursor, date);
                cursor = 0;
            } else {
                cursor = self.backlogs[pool].next_cursor(cursor);
            }
        }
    }

    fn complete(&mut self, pool: usize, cursor: usize, date: NaiveDate) {
        let entry = self.backlogs[pool].remove(cursor);
        self.open_backlogs[entry.key as usize] -= 1;
        self.completions.insert((entry.key, pool), date);
        self.efforts
            .insert((entry.key, pool), EffortRecord::from_entry(&entry));
        log_changes!(
            self.options.verbosity,
            "  Completed {} in {} on {}",
            self.task_number(entry.key),
            self.pools[pool].name,
            date
        );
    }

    /// Move unclaimed capacity to absorbing pools that still have work.
    ///
    /// Returns the pools that received a share.
    fn redistribute(&mut self, day: usize) -> Vec<usize> {
        let recipients: Vec<usize> = (0..self.pools.len())
            .filter(|&p| self.pools[p].absorbs_surplus && !self.backlogs[p].is_empty())
            .collect();
        if recipients.is_empty() {
            self.place_idle_surplus(day, self.free_surplus[day]);
            return recipients;
        }

        let mut donated = 0.0;
        for pool in 0..self.pools.len() {
            if self.pools[pool].absorbs_surplus {
                continue;
            }
            let spare = self.ledger.drain(pool, day);
            if spare > 0.0 {
                self.roadmap.subtract(pool, day, spare);
                donated += spare;
            }
        }

        let total = self.free_surplus[day] + donated;
        if total <= 0.0 {
            return recipients;
        }
        let share = total / recipients.len() as f64;
        for &pool in &recipients {
            self.roadmap.add(pool, day, share);
            if self.working[day] {
                self.ledger.grant(pool, day, share);
            }
        }
        log_checks!(
            self.options.verbosity,
            "  {}: {:.2} surplus shared by {} pool(s)",
            self.timeline.date_at(day),
            total,
            recipients.len()
        );
        recipients
    }

    /// Yielding pools surrender what they still hold to the `unused` column.
    fn collect_yielded(&mut self, day: usize) {
        let Some(unused) = self.unused_column else {
            return;
        };
        for pool in 0..self.pools.len() {
            if !self.pools[pool].yields_unused {
                continue;
            }
            let spare = self.ledger.drain(pool, day);
            if spare > 0.0 {
                self.roadmap.subtract(pool, day, spare);
                self.roadmap.add(unused, day, spare);
            }
        }
    }

    /// Surplus on a day with no absorbing pool still working.
    ///
    /// Returns false when nothing could take it.
    fn place_idle_surplus(&mut self, day: usize, amount: f64) -> bool {
        if amount <= 0.0 {
            return true;
        }
        if self.options.show_unused {
            if let Some(unused) = self.unused_column {
                self.roadmap.add(unused, day, amount);
                return true;
            }
        }
        let absorbers: Vec<usize> = (0..self.pools.len())
            .filter(|&p| self.pools[p].absorbs_surplus)
            .collect();
        if absorbers.is_empty() {
            self.roadmap.add_unallocated(day, amount);
            return false;
        }
        let share = amount / absorbers.len() as f64;
        for pool in absorbers {
            self.roadmap.add(pool, day, share);
        }
        true
    }

    /// Distributing phase: surplus of every day from `from` to the timeline end.
    fn distribute_remaining(&mut self, from: usize) {
        let mut unallocated = 0.0;
        for day in from..self.timeline.len() {
            let amount = self.free_surplus[day];
            if !self.place_idle_surplus(day, amount) {
                unallocated += amount;
            }
        }
        if unallocated > 0.0 {
            log_warn!(
                "No pools to distribute the remaining capacity on; {:.2} labor-days unallocated",
                unallocated
            );
        }
    }

    fn task_number(&self, key: TaskKey) -> &str {
        self.interner.resolve(key).unwrap_or("?")
    }

    fn into_outcome(mut self) -> ScheduleOutcome {
        for (pool, backlog) in self.backlogs.iter().enumerate() {
            for entry in backlog.entries() {
                self.efforts
                    .insert((entry.key, pool), EffortRecord::from_entry(entry));
            }
        }

        let pool_names: Vec<String> = self.pools.iter().map(|p| p.name.clone()).collect();
        let completions = &self.completions;
        let lookup = |task: usize, pool: usize| completions.get(&(task as TaskKey, pool)).copied();
        let deadlines = aggregate_deadlines(self.plan, &pool_names, lookup);
        let overdue = overdue_tasks(self.plan, &pool_names, lookup);

        ScheduleOutcome {
            roadmap: self.roadmap,
            deadlines,
            overdue,
            pools: self
                .pools
                .iter()
                .map(|p| PoolMetadata {
                    name: p.name.clone(),
                    label: p.label.clone(),
                    color: p.color.clone(),
                })
                .collect(),
            termination_day: self.termination_day,
            shortfall_days: self.shortfall_days,
            task_numbers: self.plan.tasks.iter().map(|t| t.number.clone()).collect(),
            completions: self.completions,
            efforts: self.efforts,
            remaining_backlog: self.backlogs.iter().map(Backlog::len).collect(),
            backlog_history: self.backlog_history,
        }
    }
}

fn check_len(series: &str, values: &[f64], expected: usize) -> Result<(), SchedulerError> {
    if values.len() != expected {
        return Err(SchedulerError::SeriesLength {
            series: series.to_string(),
            len: values.len(),
            expected,
        });
    }
    Ok(())
}
