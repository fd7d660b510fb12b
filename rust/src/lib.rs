//! Rust implementation of the capacity roadmap simulator.
//!
//! Simulates how a finite, time-varying pool of labor is consumed day by day by
//! a prioritised backlog, producing a roadmap of capacity use and completion
//! dates per task and per task-group.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use chrono::NaiveDate;
use pyo3::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;

pub mod adapters;
mod config;
mod interner;
pub mod logging;
mod models;
mod parameters;
mod pool;
mod scenario;
pub mod scheduler;
mod timeline;

pub use adapters::{load_plan, Dialect, IssueTrackerCsv, MrdCsv, PlanningSource, RawCsv};
pub use config::{BlockingPolicy, ConfigError, PoolConfig, ScenarioConfig};
pub use interner::{TaskKey, TaskKeyInterner};
pub use models::{pattern_matches, Plan, Task, TaskGroup, NO_CONSTRAINT};
pub use parameters::{resolve_series, Constraint, ParameterSpec};
pub use pool::{ResolvedParameters, ResourcePool};
pub use scenario::Scenario;
pub use scheduler::{
    DeadlineTable, GroupDeadline, OverdueTask, Roadmap, ScheduleOutcome, SchedulerError,
    SchedulerPhase, UNUSED_COLUMN,
};
pub use timeline::Timeline;

fn value_error(e: impl ToString) -> PyErr {
    pyo3::exceptions::PyValueError::new_err(e.to_string())
}

/// Read a planning file into `(task_groups, tasks)`.
///
/// # Arguments
/// * `path` - Planning file; `None` raises
/// * `dialect` - File dialect (default `Dialect.Raw`)
/// * `effort_pool` - Pool receiving issue-tracker time estimates
///
/// # Raises
/// * ValueError if the file is missing, malformed or holds invalid cells
#[pyfunction]
#[pyo3(name = "load_plan", signature = (path, dialect=Dialect::Raw, effort_pool=None))]
fn py_load_plan(
    path: Option<PathBuf>,
    dialect: Dialect,
    effort_pool: Option<String>,
) -> PyResult<(Vec<TaskGroup>, Vec<Task>)> {
    let plan = match (dialect, effort_pool) {
        (Dialect::IssueTracker, Some(pool)) => {
            let path = path.ok_or_else(|| value_error(ConfigError::MissingPath))?;
            IssueTrackerCsv::with_effort_pool(&pool).parse(&path)
        }
        _ => load_plan(path.as_deref(), dialect),
    }
    .map_err(value_error)?;
    Ok((plan.task_groups, plan.tasks))
}

/// Schedule `tasks` against the pools and calendar of `config`.
///
/// # Raises
/// * ValueError on configuration or plan errors; nothing is scheduled then
#[pyfunction]
fn run_scenario(
    config: ScenarioConfig,
    task_groups: Vec<TaskGroup>,
    tasks: Vec<Task>,
) -> PyResult<PyScheduleOutcome> {
    let mut scenario = Scenario::new(config).map_err(value_error)?;
    let plan = Plan::new(task_groups, tasks);
    let outcome = scenario.schedule(&plan).map_err(value_error)?;
    Ok(PyScheduleOutcome { inner: outcome })
}

/// Result of `run_scenario` (PyO3 wrapper).
#[pyclass(name = "ScheduleOutcome")]
pub struct PyScheduleOutcome {
    inner: ScheduleOutcome,
}

impl PyScheduleOutcome {
    /// Group -> pool -> `value(cell)` for every assigned group/pool cell.
    fn group_cells<T, F>(&self, value: F) -> HashMap<String, HashMap<String, T>>
    where
        F: Fn(&GroupDeadline) -> T,
    {
        let deadlines = &self.inner.deadlines;
        deadlines
            .group_names()
            .iter()
            .enumerate()
            .map(|(index, group)| {
                let row = deadlines
                    .pools()
                    .iter()
                    .filter_map(|pool| deadlines.get(index, pool).map(|cell| (pool.clone(), value(cell))))
                    .collect();
                (group.clone(), row)
            })
            .collect()
    }
}

#[pymethods]
impl PyScheduleOutcome {
    #[getter]
    fn dates(&self) -> Vec<NaiveDate> {
        self.inner.roadmap.timeline().dates().collect()
    }

    #[getter]
    fn columns(&self) -> Vec<String> {
        self.inner.roadmap.columns().to_vec()
    }

    /// Column name -> capacity used per day.
    #[getter]
    fn roadmap(&self) -> HashMap<String, Vec<f64>> {
        let roadmap = &self.inner.roadmap;
        roadmap
            .columns()
            .iter()
            .filter_map(|c| roadmap.column(c).map(|values| (c.clone(), values.to_vec())))
            .collect()
    }

    #[getter]
    fn unallocated(&self) -> Vec<f64> {
        self.inner.roadmap.unallocated().to_vec()
    }

    /// Task number -> pool -> completion date.
    #[getter]
    fn completions(&self) -> HashMap<String, HashMap<String, NaiveDate>> {
        let mut table: HashMap<String, HashMap<String, NaiveDate>> = HashMap::new();
        for (task, pool, date) in self.inner.completions() {
            table.entry(task).or_default().insert(pool, date);
        }
        table
    }

    /// Task-group -> pool -> latest recorded completion among its members.
    ///
    /// Pools with nothing assigned to the group are absent; see
    /// `group_pending` for members that never completed.
    #[getter]
    fn group_deadlines(&self) -> HashMap<String, HashMap<String, Option<NaiveDate>>> {
        self.group_cells(|cell| cell.latest)
    }

    /// Task-group -> pool -> number of assigned members that never completed.
    #[getter]
    fn group_pending(&self) -> HashMap<String, HashMap<String, usize>> {
        self.group_cells(|cell| cell.pending)
    }

    /// `(task, pool, declared, completed)` for every missed declared deadline.
    #[getter]
    fn overdue(&self) -> Vec<(String, String, NaiveDate, Option<NaiveDate>)> {
        self.inner
            .overdue
            .iter()
            .map(|o| (o.task.clone(), o.pool.clone(), o.declared, o.completed))
            .collect()
    }

    #[getter]
    fn termination_day(&self) -> Option<NaiveDate> {
        self.inner.termination_day
    }

    #[getter]
    fn shortfall_days(&self) -> Vec<NaiveDate> {
        self.inner.shortfall_days.clone()
    }

    /// `(name, label, color)` per pool, in configuration order.
    #[getter]
    fn pools(&self) -> Vec<(String, String, String)> {
        self.inner
            .pools
            .iter()
            .map(|p| (p.name.clone(), p.label.clone(), p.color.clone()))
            .collect()
    }

    fn remaining_backlog(&self, pool: &str) -> Option<usize> {
        self.inner.remaining_backlog(pool)
    }

    fn is_fully_scheduled(&self) -> bool {
        self.inner.is_fully_scheduled()
    }

    fn write_roadmap_csv(&self, path: PathBuf) -> PyResult<()> {
        let file = File::create(&path)?;
        self.inner.roadmap.write_csv(file).map_err(value_error)
    }

    fn write_deadlines_csv(&self, path: PathBuf) -> PyResult<()> {
        let file = File::create(&path)?;
        self.inner.deadlines.write_csv(file).map_err(value_error)
    }

    fn __repr__(&self) -> String {
        format!(
            "ScheduleOutcome(days={}, pools={}, termination_day={:?})",
            self.inner.roadmap.timeline().len(),
            self.inner.pools.len(),
            self.inner.termination_day
        )
    }
}

/// The capacity_roadmap.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Input types
    m.add_class::<Task>()?;
    m.add_class::<TaskGroup>()?;
    m.add_class::<Dialect>()?;

    // Config types
    m.add_class::<Constraint>()?;
    m.add_class::<PoolConfig>()?;
    m.add_class::<ScenarioConfig>()?;
    m.add_class::<BlockingPolicy>()?;

    // Results
    m.add_class::<PyScheduleOutcome>()?;

    m.add_function(wrap_pyfunction!(py_load_plan, m)?)?;
    m.add_function(wrap_pyfunction!(run_scenario, m)?)?;

    Ok(())
}
