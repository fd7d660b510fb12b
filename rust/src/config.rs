//! Configuration types for a roadmap scenario.
//!
//! A scenario is configured either from Python (pyo3 constructors with keyword
//! defaults) or from a TOML file:
//!
//! ```toml
//! name = "2025 plan"
//! timeline_start = "2025-01-01"
//! timeline_end = "2025-12-31"
//! total_capacity = 8.0
//! holidays = ["2025-12-25"]
//!
//! [[pools]]
//! name = "firmware"
//! capacity = [{ end = "2025-06-30", value = 3.0 }, { start = "2025-07-01", value = 4.0 }]
//! absorbs_surplus = true
//! ```

use chrono::{Months, NaiveDate};
use pyo3::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::parameters::ParameterSpec;

/// Errors detected before any scheduling state is touched.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Planning file path is not set")]
    MissingPath,
    #[error("Planning file does not exist: {0}")]
    PathNotFound(PathBuf),
    #[error("Cannot read {path}: {source}")]
    UnreadablePath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed table in {path}: {reason}")]
    MalformedTable { path: PathBuf, reason: String },
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),
    #[error("Unknown priority label: {0}")]
    UnknownPriorityLabel(String),
    #[error("Invalid number {value:?} in column {column}")]
    InvalidNumber { column: String, value: String },
    #[error("Invalid date {value:?} in column {column}")]
    InvalidDate { column: String, value: String },
    #[error("Attribute {attribute} of pool {pool} has no value on the timeline")]
    UnresolvableAttribute { pool: String, attribute: String },
    #[error("Attribute {attribute} of pool {pool} is negative ({value})")]
    NegativeValue {
        pool: String,
        attribute: String,
        value: f64,
    },
    #[error("Attribute {attribute} of pool {pool} is not a finite number")]
    NonFiniteValue { pool: String, attribute: String },
    #[error("Total capacity is never positive but pools {0:?} absorb surplus")]
    NonPositiveSurplusCapacity(Vec<String>),
    #[error("Pool defined twice: {0}")]
    DuplicatePool(String),
    #[error("Unknown pool: {0}")]
    UnknownPool(String),
    #[error("Timeline start {start} is after end {end}")]
    InvalidTimeline { start: NaiveDate, end: NaiveDate },
    #[error("Invalid scenario file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// What the allocation loop does when the task at the cursor is blocked.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingPolicy {
    /// A blocked head-of-line task stalls the whole pool for the day.
    #[default]
    HaltPool,
    /// Blocked tasks are passed over; the pool keeps working on the rest.
    SkipTask,
}

/// Configuration of one resource pool.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    #[pyo3(get, set)]
    pub name: String,
    /// Labor units available per day
    pub capacity: ParameterSpec,
    /// Output per unit of labor per day
    pub efficiency: ParameterSpec,
    /// Labor units needed per task for marginal progress; `<= 0` means no limit
    pub parallelizability: ParameterSpec,
    /// Capacity consumed unconditionally every day
    pub base_cost: ParameterSpec,
    #[pyo3(get, set)]
    pub absorbs_surplus: bool,
    #[pyo3(get, set)]
    pub yields_unused: bool,
    #[pyo3(get, set)]
    pub color: String,
    #[pyo3(get, set)]
    pub label: Option<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "General".to_string(),
            capacity: ParameterSpec::Constant(0.0),
            efficiency: ParameterSpec::Constant(1.0),
            parallelizability: ParameterSpec::Constant(-1.0),
            base_cost: ParameterSpec::Constant(0.0),
            absorbs_surplus: false,
            yields_unused: false,
            color: "#000000".to_string(),
            label: None,
        }
    }
}

impl PoolConfig {
    /// Pool with a constant capacity and defaults for everything else.
    pub fn with_capacity(name: &str, capacity: f64) -> Self {
        Self {
            name: name.to_string(),
            capacity: ParameterSpec::Constant(capacity),
            ..Self::default()
        }
    }

    /// Display label, falling back to the pool name.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Reject non-finite values anywhere, and negative capacity, efficiency
    /// or base cost in any configured constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (attribute, spec, signed) in [
            ("capacity", &self.capacity, false),
            ("efficiency", &self.efficiency, false),
            ("parallelizability", &self.parallelizability, true),
            ("base_cost", &self.base_cost, false),
        ] {
            for value in spec.values() {
                if !value.is_finite() {
                    return Err(ConfigError::NonFiniteValue {
                        pool: self.name.clone(),
                        attribute: attribute.to_string(),
                    });
                }
                if !signed && value < 0.0 {
                    return Err(ConfigError::NegativeValue {
                        pool: self.name.clone(),
                        attribute: attribute.to_string(),
                        value,
                    });
                }
            }
        }
        Ok(())
    }
}

#[pymethods]
impl PoolConfig {
    #[new]
    #[pyo3(signature = (
        name,
        capacity=None,
        efficiency=None,
        parallelizability=None,
        base_cost=None,
        absorbs_surplus=false,
        yields_unused=false,
        color=None,
        label=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn py_new(
        name: String,
        capacity: Option<ParameterSpec>,
        efficiency: Option<ParameterSpec>,
        parallelizability: Option<ParameterSpec>,
        base_cost: Option<ParameterSpec>,
        absorbs_surplus: bool,
        yields_unused: bool,
        color: Option<String>,
        label: Option<String>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            name,
            capacity: capacity.unwrap_or(defaults.capacity),
            efficiency: efficiency.unwrap_or(defaults.efficiency),
            parallelizability: parallelizability.unwrap_or(defaults.parallelizability),
            base_cost: base_cost.unwrap_or(defaults.base_cost),
            absorbs_surplus,
            yields_unused,
            color: color.unwrap_or(defaults.color),
            label,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "PoolConfig(name={:?}, absorbs_surplus={}, yields_unused={})",
            self.name, self.absorbs_surplus, self.yields_unused
        )
    }
}

/// Configuration of a whole scenario: timeline, calendar, pools, policies.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    #[pyo3(get, set)]
    pub name: String,
    #[pyo3(get, set)]
    pub timeline_start: NaiveDate,
    #[pyo3(get, set)]
    pub timeline_end: NaiveDate,
    /// Labor available across all pools; what pools do not claim is surplus
    pub total_capacity: ParameterSpec,
    /// Non-working days in addition to weekends
    #[pyo3(get, set)]
    pub holidays: Vec<NaiveDate>,
    /// Route surplus after the last scheduled day to the `unused` column
    #[pyo3(get, set)]
    pub show_unused: bool,
    #[pyo3(get, set)]
    pub blocking_policy: BlockingPolicy,
    /// Verbosity level for logging (0=silent, 1=changes, 2=checks, 3=debug)
    #[pyo3(get, set)]
    pub verbosity: u8,
    #[pyo3(get, set)]
    pub pools: Vec<PoolConfig>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        let today = chrono::Local::now().date_naive();
        Self {
            name: "unknown-scenario".to_string(),
            timeline_start: today,
            timeline_end: today.checked_add_months(Months::new(60)).unwrap_or(today),
            total_capacity: ParameterSpec::Constant(10.0),
            holidays: Vec::new(),
            show_unused: false,
            blocking_policy: BlockingPolicy::default(),
            verbosity: 0,
            pools: Vec::new(),
        }
    }
}

impl ScenarioConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::PathNotFound(path.to_path_buf()));
        }
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::UnreadablePath {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn pool(&self, name: &str) -> Option<&PoolConfig> {
        self.pools.iter().find(|p| p.name == name)
    }
}

#[pymethods]
impl ScenarioConfig {
    #[new]
    #[pyo3(signature = (
        pools,
        timeline_start,
        timeline_end,
        name=None,
        total_capacity=None,
        holidays=None,
        show_unused=false,
        blocking_policy=BlockingPolicy::HaltPool,
        verbosity=0
    ))]
    #[allow(clippy::too_many_arguments)]
    fn py_new(
        pools: Vec<PoolConfig>,
        timeline_start: NaiveDate,
        timeline_end: NaiveDate,
        name: Option<String>,
        total_capacity: Option<ParameterSpec>,
        holidays: Option<Vec<NaiveDate>>,
        show_unused: bool,
        blocking_policy: BlockingPolicy,
        verbosity: u8,
    ) -> Self {
        let defaults = Self::default();
        Self {
            name: name.unwrap_or(defaults.name),
            timeline_start,
            timeline_end,
            total_capacity: total_capacity.unwrap_or(defaults.total_capacity),
            holidays: holidays.unwrap_or_default(),
            show_unused,
            blocking_policy,
            verbosity,
            pools,
        }
    }

    #[staticmethod]
    #[pyo3(name = "from_toml")]
    fn py_from_toml(source: &str) -> PyResult<Self> {
        Self::from_toml_str(source)
            .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))
    }

    fn __repr__(&self) -> String {
        format!(
            "ScenarioConfig(name={:?}, timeline={}..{}, pools={})",
            self.name,
            self.timeline_start,
            self.timeline_end,
            self.pools.len()
        )
    }
}
