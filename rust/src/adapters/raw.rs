//! Numbered planning tables.
//!
//! ```text
//! Number, Name, dev, qa, dev-constraint, dev-deadline, priority
//! 1.1,    Release 1,    ,   ,               , 2024-06-30,
//! 1.1.1,  Parser,   4,  1, NONE          ,           , 2
//! 1.1.2,  Codegen,  6,  2, 1.1.1         ,           ,
//! ```
//!
//! `N.N` rows open a task-group; `N.N.N` rows are tasks of the most recent
//! group; anything else is ignored. Columns right of the fixed ones are effort
//! per pool, `<pool>-constraint` blocking patterns and `<pool>-deadline` dates.
//! Missing complementary columns read as empty.

use std::path::Path;

use super::{
    classify, malformed, open_table, parse_date, parse_effort, Numbering, PlanningSource,
    PoolColumn,
};
use crate::config::ConfigError;
use crate::models::{Plan, Task, TaskGroup, NO_CONSTRAINT};

const NUMBER: &str = "Number";
const NAME: &str = "Name";
const PRIORITY: &str = "priority";

/// Column layout shared by the numbered dialects.
#[derive(Clone, Copy, Debug)]
pub(crate) struct NumberedLayout {
    /// Columns before the first pool column
    pub fixed_columns: usize,
    /// Read a `priority` column if present
    pub priority: bool,
}

/// Plain numbered CSV: `Number, Name, <pool columns>..., [priority]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawCsv;

impl RawCsv {
    const LAYOUT: NumberedLayout = NumberedLayout {
        fixed_columns: 2,
        priority: true,
    };
}

impl PlanningSource for RawCsv {
    fn parse(&self, path: &Path) -> Result<Plan, ConfigError> {
        read_numbered(path, Self::LAYOUT)
    }
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}

pub(crate) fn read_numbered(path: &Path, layout: NumberedLayout) -> Result<Plan, ConfigError> {
    let mut reader = open_table(path)?;
    let headers = reader.headers().map_err(|e| malformed(path, e))?.clone();
    let number_column =
        find_column(&headers, NUMBER).ok_or_else(|| malformed(path, "no Number column"))?;
    let name_column =
        find_column(&headers, NAME).ok_or_else(|| malformed(path, "no Name column"))?;

    let mut priority_column = None;
    let mut pool_columns = Vec::new();
    for (index, header) in headers.iter().enumerate().skip(layout.fixed_columns) {
        if header.is_empty() {
            continue;
        }
        if layout.priority && header.eq_ignore_ascii_case(PRIORITY) {
            priority_column = Some(index);
        } else {
            pool_columns.push((index, PoolColumn::from_header(header)));
        }
    }

    let mut plan = Plan::default();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| malformed(path, e))?;
        let cell = |index: usize| record.get(index).unwrap_or("");
        let number = cell(number_column);

        match classify(number) {
            Numbering::Group => {
                let mut group = TaskGroup::named(cell(name_column));
                for (index, column) in &pool_columns {
                    if let PoolColumn::Deadline(pool) = column {
                        if let Some(date) = parse_date(&headers[*index], cell(*index))? {
                            group.deadlines.insert(pool.clone(), date);
                        }
                    }
                }
                plan.task_groups.push(group);
            }
            Numbering::Task => {
                let group_index = plan.task_groups.len().checked_sub(1).ok_or_else(|| {
                    // Header is line 1
                    malformed(path, format!("task {} on line {} has no task-group", number, row + 2))
                })?;
                let mut task = Task::new(number, cell(name_column), group_index);
                for (index, column) in &pool_columns {
                    let header = &headers[*index];
                    let value = cell(*index);
                    match column {
                        PoolColumn::Effort(pool) => {
                            let effort = parse_effort(header, value)?;
                            if effort != 0.0 {
                                task.efforts.insert(pool.clone(), effort);
                            }
                        }
                        PoolColumn::Constraint(pool) => {
                            if !value.is_empty() && value != NO_CONSTRAINT {
                                task.blocked_by.insert(pool.clone(), value.to_string());
                            }
                        }
                        PoolColumn::Deadline(pool) => {
                            if let Some(date) = parse_date(header, value)? {
                                task.deadlines.insert(pool.clone(), date);
                            }
                        }
                    }
                }
                if let Some(index) = priority_column {
                    let value = cell(index);
                    if !value.is_empty() {
                        task.priority = value.parse().map_err(|_| ConfigError::InvalidNumber {
                            column: PRIORITY.to_string(),
                            value: value.to_string(),
                        })?;
                    }
                }
                plan.tasks.push(task);
            }
            Numbering::Other => {}
        }
    }

    plan.validate()?;
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_groups_tasks_and_columns() {
        let file = write_csv(
            "Number, Name, dev, qa, dev-constraint, dev-deadline, priority\n\
             1.1, Release 1, , , , 2024-06-30,\n\
             1.1.1, Parser, 4, 1, NONE, , 2\n\
             1.1.2, Codegen, 6, , 1.1.1, 2024-05-01,\n\
             notes, ignored, 1, 1, , ,\n\
             1.2, Release 2, , , , ,\n\
             1.2.1, Docs, , 2.5, , ,\n",
        );
        let plan = RawCsv.parse(file.path()).unwrap();

        assert_eq!(plan.task_groups.len(), 2);
        assert_eq!(
            plan.task_groups[0].deadlines.get("dev"),
            NaiveDate::from_ymd_opt(2024, 6, 30).as_ref()
        );
        assert_eq!(plan.tasks.len(), 3);

        let parser = &plan.tasks[0];
        assert_eq!(parser.number, "1.1.1");
        assert_eq!(parser.effort("dev"), 4.0);
        assert_eq!(parser.priority, 2);
        assert_eq!(parser.blocking_pattern("dev"), None);

        let codegen = &plan.tasks[1];
        assert!(!codegen.is_assigned("qa"));
        assert_eq!(codegen.blocking_pattern("dev"), Some("1.1.1"));
        assert_eq!(
            codegen.deadlines.get("dev"),
            NaiveDate::from_ymd_opt(2024, 5, 1).as_ref()
        );

        let docs = &plan.tasks[2];
        assert_eq!(docs.group_index, 1);
        assert_eq!(docs.effort("qa"), 2.5);
    }

    #[test]
    fn test_missing_complementary_columns() {
        let file = write_csv("Number,Name,dev\n1.1,R1,\n1.1.1,A,3\n");
        let plan = RawCsv.parse(file.path()).unwrap();
        assert_eq!(plan.tasks[0].effort("dev"), 3.0);
        assert!(plan.tasks[0].blocked_by.is_empty());
        assert_eq!(plan.tasks[0].priority, 0);
    }

    #[test]
    fn test_task_before_group_is_malformed() {
        let file = write_csv("Number,Name,dev\n1.1.1,A,3\n");
        assert!(matches!(
            RawCsv.parse(file.path()),
            Err(ConfigError::MalformedTable { .. })
        ));
    }

    #[test]
    fn test_bad_effort_cell() {
        let file = write_csv("Number,Name,dev\n1.1,R1,\n1.1.1,A,three\n");
        match RawCsv.parse(file.path()) {
            Err(ConfigError::InvalidNumber { column, value }) => {
                assert_eq!(column, "dev");
                assert_eq!(value, "three");
            }
            other => panic!("expected invalid number, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_task_numbers_rejected() {
        let file = write_csv("Number,Name,dev\n1.1,R1,\n1.1.1,A,1\n1.1.1,B,1\n");
        assert!(matches!(
            RawCsv.parse(file.path()),
            Err(ConfigError::InvalidPlan(_))
        ));
    }
}
