//! Day-by-day forward scheduler.
//!
//! This module provides the scheduler state machine together with the data it
//! owns while running (backlogs, capacity ledger, roadmap) and the deadline
//! aggregation that runs once scheduling is done.

mod backlog;
mod core;
mod deadlines;
mod outcome;
mod roadmap;
mod state;

pub use backlog::{snap, Backlog, BacklogEntry, EPSILON};
pub use core::{PoolSnapshot, Scheduler, SchedulerError, SchedulerOptions};
pub use deadlines::{aggregate_deadlines, overdue_tasks, DeadlineTable, GroupDeadline, OverdueTask};
pub use outcome::{EffortRecord, PoolMetadata, ScheduleOutcome};
pub use roadmap::{Roadmap, UNUSED_COLUMN};
pub use state::{CapacityLedger, SchedulerPhase};
