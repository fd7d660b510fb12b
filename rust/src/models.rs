//! Core data types for planning input: task-groups and tasks.

use chrono::NaiveDate;
use pyo3::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::config::ConfigError;

// Note: We use std HashMap here for PyO3 interface compatibility

/// Marker used by some planning files for "no blocking constraint".
pub const NO_CONSTRAINT: &str = "NONE";

/// A named bucket of tasks, e.g. a release or milestone.
#[pyclass]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskGroup {
    #[pyo3(get, set)]
    pub name: String,
    /// Declared target date per pool, if the planning file carries one
    #[pyo3(get, set)]
    pub deadlines: HashMap<String, NaiveDate>,
}

impl TaskGroup {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            deadlines: HashMap::new(),
        }
    }
}

#[pymethods]
impl TaskGroup {
    #[new]
    #[pyo3(signature = (name, deadlines=None))]
    fn py_new(name: String, deadlines: Option<HashMap<String, NaiveDate>>) -> Self {
        Self {
            name,
            deadlines: deadlines.unwrap_or_default(),
        }
    }

    fn __repr__(&self) -> String {
        format!("TaskGroup(name={:?})", self.name)
    }
}

/// A unit of work owing effort to one or more pools.
#[pyclass]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Task {
    /// Unique task number, e.g. "1.2.3"
    #[pyo3(get, set)]
    pub number: String,
    #[pyo3(get, set)]
    pub name: String,
    /// Index into the plan's task-groups
    #[pyo3(get, set)]
    pub group_index: usize,
    /// Labor-days owed per pool; zero or missing means not assigned
    #[pyo3(get, set)]
    pub efforts: HashMap<String, f64>,
    /// Per pool: pattern of task numbers that must leave every backlog first
    #[pyo3(get, set)]
    pub blocked_by: HashMap<String, String>,
    /// Declared target date per pool, used for overdue reporting only
    #[pyo3(get, set)]
    pub deadlines: HashMap<String, NaiveDate>,
    /// Higher is scheduled first
    #[pyo3(get, set)]
    pub priority: i32,
}

impl Task {
    pub fn new(number: &str, name: &str, group_index: usize) -> Self {
        Self {
            number: number.to_string(),
            name: name.to_string(),
            group_index,
            ..Self::default()
        }
    }

    /// Builder-style helper to assign effort in a pool.
    pub fn with_effort(mut self, pool: &str, effort: f64) -> Self {
        self.efforts.insert(pool.to_string(), effort);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_blocker(mut self, pool: &str, pattern: &str) -> Self {
        self.blocked_by.insert(pool.to_string(), pattern.to_string());
        self
    }

    /// Effort owed to `pool`; 0.0 when not assigned.
    pub fn effort(&self, pool: &str) -> f64 {
        self.efforts.get(pool).copied().unwrap_or(0.0)
    }

    pub fn is_assigned(&self, pool: &str) -> bool {
        self.effort(pool) != 0.0
    }

    /// Blocking pattern for `pool`, ignoring empty cells and the `NONE` marker.
    pub fn blocking_pattern(&self, pool: &str) -> Option<&str> {
        self.blocked_by
            .get(pool)
            .map(|p| p.trim())
            .filter(|p| !p.is_empty() && *p != NO_CONSTRAINT)
    }
}

/// Whether `pattern` identifies `task_number`: the number itself, or a leading
/// run of whole dot-separated segments of it.
pub fn pattern_matches(pattern: &str, task_number: &str) -> bool {
    match task_number.strip_prefix(pattern) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

#[pymethods]
impl Task {
    #[new]
    #[pyo3(signature = (number, name, group_index, efforts=None, blocked_by=None, deadlines=None, priority=0))]
    fn py_new(
        number: String,
        name: String,
        group_index: usize,
        efforts: Option<HashMap<String, f64>>,
        blocked_by: Option<HashMap<String, String>>,
        deadlines: Option<HashMap<String, NaiveDate>>,
        priority: i32,
    ) -> Self {
        Self {
            number,
            name,
            group_index,
            efforts: efforts.unwrap_or_default(),
            blocked_by: blocked_by.unwrap_or_default(),
            deadlines: deadlines.unwrap_or_default(),
            priority,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Task(number={:?}, group={}, pools={}, priority={})",
            self.number,
            self.group_index,
            self.efforts.len(),
            self.priority
        )
    }
}

/// The two planning tables produced by an input adapter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Plan {
    pub task_groups: Vec<TaskGroup>,
    pub tasks: Vec<Task>,
}

impl Plan {
    pub fn new(task_groups: Vec<TaskGroup>, tasks: Vec<Task>) -> Self {
        Self { task_groups, tasks }
    }

    /// Check that task numbers are unique, every task points at a real group
    /// and every effort is a finite, non-negative number.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.tasks.len());
        for task in &self.tasks {
            if !seen.insert(task.number.as_str()) {
                return Err(ConfigError::InvalidPlan(format!(
                    "duplicate task number {}",
                    task.number
                )));
            }
            if task.group_index >= self.task_groups.len() {
                return Err(ConfigError::InvalidPlan(format!(
                    "task {} refers to missing task-group {}",
                    task.number, task.group_index
                )));
            }
            if let Some((pool, effort)) = task
                .efforts
                .iter()
                .find(|(_, e)| !e.is_finite() || **e < 0.0)
            {
                return Err(ConfigError::InvalidPlan(format!(
                    "task {} has invalid effort {} in pool {}",
                    task.number, effort, pool
                )));
            }
        }
        Ok(())
    }

    /// Pool names referenced by any task, in first-seen order.
    pub fn referenced_pools(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for task in &self.tasks {
            let mut pools: Vec<&String> = task.efforts.keys().collect();
            pools.sort();
            for pool in pools {
                if seen.insert(pool.clone()) {
                    names.push(pool.clone());
                }
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_pattern_ignores_placeholders() {
        let task = Task::new("1.1.1", "a", 0)
            .with_blocker("dev", "NONE")
            .with_blocker("qa", "  ")
            .with_blocker("ops", "1.2");
        assert_eq!(task.blocking_pattern("dev"), None);
        assert_eq!(task.blocking_pattern("qa"), None);
        assert_eq!(task.blocking_pattern("ops"), Some("1.2"));
        assert_eq!(task.blocking_pattern("missing"), None);
    }

    #[test]
    fn test_pattern_matches_number_or_prefix() {
        assert!(pattern_matches("1.2.3", "1.2.3"));
        assert!(pattern_matches("1.2", "1.2.3"));
        assert!(!pattern_matches("1.3", "1.2.3"));
    }

    #[test]
    fn test_pattern_matches_whole_segments_only() {
        assert!(!pattern_matches("1.1.1", "1.1.10"));
        assert!(!pattern_matches("1.1.1", "1.1.11"));
        assert!(!pattern_matches("1", "10.1.1"));
        assert!(pattern_matches("1", "1.10.1"));
    }

    #[test]
    fn test_effort_defaults_to_zero() {
        let task = Task::new("1.1.1", "a", 0).with_effort("dev", 3.0);
        assert_eq!(task.effort("dev"), 3.0);
        assert_eq!(task.effort("qa"), 0.0);
        assert!(task.is_assigned("dev"));
        assert!(!task.is_assigned("qa"));
    }

    #[test]
    fn test_plan_rejects_duplicate_numbers() {
        let plan = Plan::new(
            vec![TaskGroup::named("r1")],
            vec![Task::new("1.1.1", "a", 0), Task::new("1.1.1", "b", 0)],
        );
        assert!(matches!(plan.validate(), Err(ConfigError::InvalidPlan(_))));
    }

    #[test]
    fn test_plan_rejects_dangling_group() {
        let plan = Plan::new(vec![TaskGroup::named("r1")], vec![Task::new("1.1.1", "a", 1)]);
        assert!(matches!(plan.validate(), Err(ConfigError::InvalidPlan(_))));
    }

    #[test]
    fn test_plan_rejects_invalid_effort() {
        for effort in [-1.0, f64::NAN, f64::INFINITY] {
            let plan = Plan::new(
                vec![TaskGroup::named("r1")],
                vec![Task::new("1.1.1", "a", 0).with_effort("dev", effort)],
            );
            assert!(matches!(plan.validate(), Err(ConfigError::InvalidPlan(_))), "{}", effort);
        }
    }

    #[test]
    fn test_referenced_pools_first_seen_order() {
        let plan = Plan::new(
            vec![TaskGroup::named("r1")],
            vec![
                Task::new("1.1.1", "a", 0).with_effort("qa", 1.0),
                Task::new("1.1.2", "b", 0)
                    .with_effort("dev", 1.0)
                    .with_effort("qa", 2.0),
            ],
        );
        assert_eq!(plan.referenced_pools(), vec!["qa".to_string(), "dev".to_string()]);
    }
}
