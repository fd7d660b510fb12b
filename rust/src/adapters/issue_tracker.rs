//! Issue-tracker CSV export.
//!
//! Milestones become task-groups (sorted ascending, with a trailing
//! [`UNDETERMINED_GROUP`] for issues without one). Time estimates are seconds
//! and land in a single effort pool as 8-hour labor-days. `priority::*` labels
//! set the priority; tasks come out ordered by group, then priority descending.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

use super::{malformed, open_table, PlanningSource};
use crate::config::ConfigError;
use crate::models::{Plan, Task, TaskGroup};

/// Group collecting issues with no milestone.
pub const UNDETERMINED_GROUP: &str = "undetermined";
/// Pool that receives the time estimates unless configured otherwise.
pub const DEFAULT_EFFORT_POOL: &str = "development";

const PRIORITY_LABEL_PREFIX: &str = "priority::";
const SECONDS_PER_LABOR_DAY: f64 = 3600.0 * 8.0;

#[derive(Debug, Deserialize)]
struct IssueRecord {
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Issue ID")]
    issue_id: String,
    #[serde(rename = "Milestone", default)]
    milestone: Option<String>,
    #[serde(rename = "Labels", default)]
    labels: Option<String>,
    /// Seconds
    #[serde(rename = "Time Estimate", default)]
    time_estimate: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct IssueTrackerCsv {
    pub effort_pool: String,
}

impl Default for IssueTrackerCsv {
    fn default() -> Self {
        Self {
            effort_pool: DEFAULT_EFFORT_POOL.to_string(),
        }
    }
}

impl IssueTrackerCsv {
    pub fn with_effort_pool(pool: &str) -> Self {
        Self {
            effort_pool: pool.to_string(),
        }
    }
}

/// Priority from a comma-separated label list; the highest known label wins.
fn priority_from_labels(labels: &str) -> Result<i32, ConfigError> {
    let mut priority = 0;
    for label in labels.split(',').map(str::trim) {
        let Some(level) = label.strip_prefix(PRIORITY_LABEL_PREFIX) else {
            continue;
        };
        let value = match level {
            "high" => 3,
            "medium" => 2,
            "low" => 1,
            _ => return Err(ConfigError::UnknownPriorityLabel(label.to_string())),
        };
        priority = priority.max(value);
    }
    Ok(priority)
}

impl PlanningSource for IssueTrackerCsv {
    fn parse(&self, path: &Path) -> Result<Plan, ConfigError> {
        let mut reader = open_table(path)?;
        let mut records = Vec::new();
        for record in reader.deserialize::<IssueRecord>() {
            records.push(record.map_err(|e| malformed(path, e))?);
        }

        let milestones: BTreeSet<&str> = records
            .iter()
            .filter_map(|r| r.milestone.as_deref())
            .filter(|m| !m.is_empty() && *m != UNDETERMINED_GROUP)
            .collect();
        let mut task_groups: Vec<TaskGroup> =
            milestones.iter().map(|m| TaskGroup::named(m)).collect();
        task_groups.push(TaskGroup::named(UNDETERMINED_GROUP));
        let undetermined = task_groups.len() - 1;

        let mut tasks = Vec::with_capacity(records.len());
        for record in &records {
            let group_index = record
                .milestone
                .as_deref()
                .and_then(|m| milestones.iter().position(|known| *known == m))
                .unwrap_or(undetermined);
            let effort = record.time_estimate.unwrap_or(0.0) / SECONDS_PER_LABOR_DAY;
            let priority = priority_from_labels(record.labels.as_deref().unwrap_or(""))?;
            tasks.push(
                Task::new(&record.issue_id, &record.title, group_index)
                    .with_effort(&self.effort_pool, effort)
                    .with_priority(priority),
            );
        }
        // Stable, so equal priorities keep export order
        tasks.sort_by_key(|t| (t.group_index, std::cmp::Reverse(t.priority)));

        let plan = Plan::new(task_groups, tasks);
        plan.validate()?;
        Ok(plan)
    }
}
