//! Planning-file readers.
//!
//! Every dialect produces the same two tables (task-groups and tasks) as a
//! [`Plan`]. The scheduler never looks at files; a dialect is picked explicitly
//! through [`Dialect::source`].

mod issue_tracker;
mod mrd;
mod raw;

pub use issue_tracker::{IssueTrackerCsv, DEFAULT_EFFORT_POOL, UNDETERMINED_GROUP};
pub use mrd::MrdCsv;
pub use raw::RawCsv;

use chrono::NaiveDate;
use pyo3::prelude::*;
use std::fs::File;
use std::path::Path;

use crate::config::ConfigError;
use crate::models::{Plan, NO_CONSTRAINT};

/// Suffix of a column holding the blocking pattern for a pool.
pub const CONSTRAINT_SUFFIX: &str = "-constraint";
/// Suffix of a column holding a declared deadline for a pool.
pub const DEADLINE_SUFFIX: &str = "-deadline";

/// Anything that can turn a planning file into a [`Plan`].
pub trait PlanningSource {
    fn parse(&self, path: &Path) -> Result<Plan, ConfigError>;
}

/// Supported planning-file dialects.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Dialect {
    /// Numbered rows with one effort column per pool
    #[default]
    Raw,
    /// Requirements-document export with a `Responsible` column
    Mrd,
    /// Issue-tracker export grouped by milestone
    IssueTracker,
}

impl Dialect {
    pub fn source(&self) -> Box<dyn PlanningSource> {
        match self {
            Self::Raw => Box::new(RawCsv),
            Self::Mrd => Box::new(MrdCsv),
            Self::IssueTracker => Box::new(IssueTrackerCsv::default()),
        }
    }
}

/// Read a plan with `dialect`. `None` is reported as a missing path.
pub fn load_plan(path: Option<&Path>, dialect: Dialect) -> Result<Plan, ConfigError> {
    let path = path.ok_or(ConfigError::MissingPath)?;
    dialect.source().parse(path)
}

/// Kind of a row, from the shape of its number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Numbering {
    /// `N.N`
    Group,
    /// `N.N.N`
    Task,
    Other,
}

pub(crate) fn classify(number: &str) -> Numbering {
    let parts: Vec<&str> = number.trim().split('.').collect();
    let numeric = parts
        .iter()
        .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
    match (numeric, parts.len()) {
        (true, 2) => Numbering::Group,
        (true, 3) => Numbering::Task,
        _ => Numbering::Other,
    }
}

/// Open `path` as a headed CSV table with whitespace around fields trimmed.
pub(crate) fn open_table(path: &Path) -> Result<csv::Reader<File>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::PathNotFound(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|source| ConfigError::UnreadablePath {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file))
}

pub(crate) fn malformed(path: &Path, reason: impl ToString) -> ConfigError {
    ConfigError::MalformedTable {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Labor-days in a cell; empty means zero.
pub(crate) fn parse_effort(column: &str, value: &str) -> Result<f64, ConfigError> {
    if value.is_empty() {
        return Ok(0.0);
    }
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        column: column.to_string(),
        value: value.to_string(),
    })
}

/// Date in a cell; empty and `NONE` mean no date.
pub(crate) fn parse_date(column: &str, value: &str) -> Result<Option<NaiveDate>, ConfigError> {
    if value.is_empty() || value == NO_CONSTRAINT {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ConfigError::InvalidDate {
            column: column.to_string(),
            value: value.to_string(),
        })
}

/// Role of a column to the right of a numbered table's fixed columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PoolColumn {
    Effort(String),
    Constraint(String),
    Deadline(String),
}

impl PoolColumn {
    pub(crate) fn from_header(header: &str) -> Self {
        if let Some(pool) = header.strip_suffix(CONSTRAINT_SUFFIX) {
            Self::Constraint(pool.to_string())
        } else if let Some(pool) = header.strip_suffix(DEADLINE_SUFFIX) {
            Self::Deadline(pool.to_string())
        } else {
            Self::Effort(header.to_string())
        }
    }
}
