//! Deadline aggregation over recorded completion dates.
//!
//! Runs once after scheduling is done and never touches scheduler state: it is
//! a pure function of the plan and a completion lookup.

use chrono::NaiveDate;
use std::io::Write;

use crate::models::Plan;

/// Computed deadline of one task-group in one pool.
///
/// Only exists when at least one member task was assigned to the pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupDeadline {
    /// Latest completion among assigned members that completed
    pub latest: Option<NaiveDate>,
    /// Assigned members that never completed on the timeline
    pub pending: usize,
    /// Target date declared in the planning file, if any
    pub declared: Option<NaiveDate>,
}

impl GroupDeadline {
    /// Every assigned member finished.
    pub fn is_complete(&self) -> bool {
        self.pending == 0
    }

    /// Finished after the declared date, or did not finish while one was declared.
    pub fn is_late(&self) -> bool {
        match (self.declared, self.latest) {
            (Some(_), _) if self.pending > 0 => true,
            (Some(declared), Some(latest)) => latest > declared,
            _ => false,
        }
    }
}

/// Per task-group, per pool computed deadlines.
#[derive(Clone, Debug, PartialEq)]
pub struct DeadlineTable {
    pools: Vec<String>,
    group_names: Vec<String>,
    /// `cells[group][pool]`
    cells: Vec<Vec<Option<GroupDeadline>>>,
}

impl DeadlineTable {
    pub fn pools(&self) -> &[String] {
        &self.pools
    }

    pub fn group_names(&self) -> &[String] {
        &self.group_names
    }

    /// Deadline of group `group_index` in `pool`; `None` when never assigned there.
    pub fn get(&self, group_index: usize, pool: &str) -> Option<&GroupDeadline> {
        let pool_index = self.pools.iter().position(|p| p == pool)?;
        self.cells.get(group_index)?.get(pool_index)?.as_ref()
    }

    /// Same as [`DeadlineTable::get`], looking the group up by name.
    pub fn for_group(&self, group: &str, pool: &str) -> Option<&GroupDeadline> {
        let group_index = self.group_names.iter().position(|g| g == group)?;
        self.get(group_index, pool)
    }

    /// Write one row per group with a `<pool>,<pool>_pending` column pair per
    /// pool: the latest recorded completion and the count of members still
    /// pending. Both are empty where the group has nothing assigned.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut out = csv::Writer::from_writer(writer);
        let mut header = vec!["group".to_string()];
        for pool in &self.pools {
            header.push(pool.clone());
            header.push(format!("{}_pending", pool));
        }
        out.write_record(&header)?;

        for (name, row) in self.group_names.iter().zip(&self.cells) {
            let mut record = vec![name.clone()];
            for cell in row {
                match cell {
                    Some(deadline) => {
                        record.push(
                            deadline
                                .latest
                                .map(|date| date.format("%Y-%m-%d").to_string())
                                .unwrap_or_default(),
                        );
                        record.push(deadline.pending.to_string());
                    }
                    None => record.extend([String::new(), String::new()]),
                }
            }
            out.write_record(&record)?;
        }
        out.flush()?;
        Ok(())
    }
}

/// A task that missed the deadline declared for it in a pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverdueTask {
    pub task: String,
    pub pool: String,
    pub declared: NaiveDate,
    /// `None` when the task never completed on the timeline
    pub completed: Option<NaiveDate>,
}

/// Aggregate per-group deadlines.
///
/// `completion(task_index, pool_index)` returns the recorded completion date of
/// a task in a pool of `pools`.
pub fn aggregate_deadlines<F>(plan: &Plan, pools: &[String], completion: F) -> DeadlineTable
where
    F: Fn(usize, usize) -> Option<NaiveDate>,
{
    let mut cells: Vec<Vec<Option<GroupDeadline>>> =
        vec![vec![None; pools.len()]; plan.task_groups.len()];

    for (task_index, task) in plan.tasks.iter().enumerate() {
        for (pool_index, pool) in pools.iter().enumerate() {
            if !task.is_assigned(pool) {
                continue;
            }
            let Some(row) = cells.get_mut(task.group_index) else {
                continue;
            };
            let cell = row[pool_index].get_or_insert_with(|| GroupDeadline {
                latest: None,
                pending: 0,
                declared: plan.task_groups[task.group_index]
                    .deadlines
                    .get(pool)
                    .copied(),
            });
            match completion(task_index, pool_index) {
                Some(date) => cell.latest = Some(cell.latest.map_or(date, |l| l.max(date))),
                None => cell.pending += 1,
            }
        }
    }

    DeadlineTable {
        pools: pools.to_vec(),
        group_names: plan.task_groups.iter().map(|g| g.name.clone()).collect(),
        cells,
    }
}

/// Tasks whose completion in a pool is later than the deadline declared for it.
pub fn overdue_tasks<F>(plan: &Plan, pools: &[String], completion: F) -> Vec<OverdueTask>
where
    F: Fn(usize, usize) -> Option<NaiveDate>,
{
    let mut overdue = Vec::new();
    for (task_index, task) in plan.tasks.iter().enumerate() {
        for (pool_index, pool) in pools.iter().enumerate() {
            let Some(&declared) = task.deadlines.get(pool) else {
                continue;
            };
            if !task.is_assigned(pool) {
                continue;
            }
            let completed = completion(task_index, pool_index);
            if completed.map_or(true, |date| date > declared) {
                overdue.push(OverdueTask {
                    task: task.number.clone(),
                    pool: pool.clone(),
                    declared,
                    completed,
                });
            }
        }
    }
    overdue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Task, TaskGroup};
    use std::collections::HashMap;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn plan() -> Plan {
        Plan::new(
            vec![TaskGroup::named("r1"), TaskGroup::named("r2")],
            vec![
                Task::new("1.1.1", "a", 0).with_effort("dev", 2.0),
                Task::new("1.1.2", "b", 0)
                    .with_effort("dev", 1.0)
                    .with_effort("qa", 1.0),
                Task::new("1.2.1", "c", 1).with_effort("dev", 1.0),
            ],
        )
    }

    fn pools() -> Vec<String> {
        vec!["dev".to_string(), "qa".to_string()]
    }

    #[test]
    fn test_latest_completion_wins() {
        let done: HashMap<(usize, usize), NaiveDate> = [
            ((0, 0), d(2024, 1, 5)),
            ((1, 0), d(2024, 1, 3)),
            ((1, 1), d(2024, 1, 4)),
            ((2, 0), d(2024, 1, 9)),
        ]
        .into_iter()
        .collect();
        let table = aggregate_deadlines(&plan(), &pools(), |t, p| done.get(&(t, p)).copied());

        let r1_dev = table.get(0, "dev").unwrap();
        assert_eq!(r1_dev.latest, Some(d(2024, 1, 5)));
        assert!(r1_dev.is_complete());
        assert_eq!(table.get(0, "qa").unwrap().latest, Some(d(2024, 1, 4)));
        assert_eq!(table.for_group("r2", "dev").unwrap().latest, Some(d(2024, 1, 9)));
    }

    #[test]
    fn test_unassigned_pool_is_absent() {
        let table = aggregate_deadlines(&plan(), &pools(), |_, _| Some(d(2024, 1, 1)));
        assert!(table.get(1, "qa").is_none());
        assert!(table.get(0, "ops").is_none());
    }

    #[test]
    fn test_incomplete_members_are_pending() {
        let table = aggregate_deadlines(&plan(), &pools(), |t, _| {
            (t == 0).then(|| d(2024, 1, 2))
        });
        let r1_dev = table.get(0, "dev").unwrap();
        assert_eq!(r1_dev.latest, Some(d(2024, 1, 2)));
        assert_eq!(r1_dev.pending, 1);
        assert!(!r1_dev.is_complete());
    }

    #[test]
    fn test_declared_group_deadline_lateness() {
        let mut plan = plan();
        plan.task_groups[0]
            .deadlines
            .insert("dev".to_string(), d(2024, 1, 4));
        let table = aggregate_deadlines(&plan, &pools(), |_, _| Some(d(2024, 1, 5)));
        assert!(table.get(0, "dev").unwrap().is_late());
        assert!(!table.get(1, "dev").unwrap().is_late());
    }

    #[test]
    fn test_overdue_tasks() {
        let mut plan = plan();
        plan.tasks[0]
            .deadlines
            .insert("dev".to_string(), d(2024, 1, 3));
        plan.tasks[2]
            .deadlines
            .insert("dev".to_string(), d(2024, 1, 30));
        plan.tasks[1]
            .deadlines
            .insert("qa".to_string(), d(2024, 1, 30));
        let overdue = overdue_tasks(&plan, &pools(), |t, p| match (t, p) {
            (0, 0) => Some(d(2024, 1, 5)),
            (2, 0) => Some(d(2024, 1, 6)),
            _ => None,
        });
        assert_eq!(overdue.len(), 2);
        assert_eq!(overdue[0].task, "1.1.1");
        assert_eq!(overdue[0].completed, Some(d(2024, 1, 5)));
        assert_eq!(overdue[1].task, "1.1.2");
        assert_eq!(overdue[1].completed, None);
    }

    #[test]
    fn test_deadline_csv() {
        let table = aggregate_deadlines(&plan(), &pools(), |t, _| {
            (t != 2).then(|| d(2024, 1, 2))
        });
        let mut buffer = Vec::new();
        table.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "group,dev,dev_pending,qa,qa_pending");
        assert_eq!(lines[1], "r1,2024-01-02,0,2024-01-02,0");
        assert_eq!(lines[2], "r2,,1,,");
    }

    #[test]
    fn test_deadline_csv_keeps_latest_while_pending() {
        let table = aggregate_deadlines(&plan(), &pools(), |t, _| {
            (t == 0).then(|| d(2024, 1, 1))
        });
        let mut buffer = Vec::new();
        table.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        // r1/dev: one member done, one pending; r1/qa: only member pending
        assert_eq!(lines[1], "r1,2024-01-01,1,,1");
        assert_eq!(lines[2], "r2,,1,,");
    }
}
