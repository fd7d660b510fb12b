//! Piecewise time-varying parameters.
//!
//! A pool attribute is configured either as a constant or as an ordered list of
//! date-bounded [`Constraint`]s. Resolution against a [`Timeline`] marks every
//! covered day (later constraints win), then forward-fills and back-fills the
//! gaps so every day carries a value.

use chrono::NaiveDate;
use pyo3::prelude::*;
use serde::{Deserialize, Serialize};

use crate::timeline::Timeline;

/// A value that applies on `[start, end]`. Missing bounds are unbounded.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    #[pyo3(get, set)]
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[pyo3(get, set)]
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[pyo3(get, set)]
    pub value: f64,
}

impl Constraint {
    /// Sentinel for an unbounded start.
    pub const INFINITE_START: NaiveDate = NaiveDate::MIN;
    /// Sentinel for an unbounded end.
    pub const INFINITE_END: NaiveDate = NaiveDate::MAX;

    pub fn between(start: NaiveDate, end: NaiveDate, value: f64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            value,
        }
    }

    /// Constraint covering every day.
    pub fn always(value: f64) -> Self {
        Self {
            start: None,
            end: None,
            value,
        }
    }

    pub fn effective_start(&self) -> NaiveDate {
        self.start.unwrap_or(Self::INFINITE_START)
    }

    pub fn effective_end(&self) -> NaiveDate {
        self.end.unwrap_or(Self::INFINITE_END)
    }
}

#[pymethods]
impl Constraint {
    #[new]
    #[pyo3(signature = (value, start=None, end=None))]
    fn py_new(value: f64, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end, value }
    }

    fn __repr__(&self) -> String {
        format!(
            "Constraint(start={:?}, end={:?}, value={})",
            self.start, self.end, self.value
        )
    }
}

/// Configuration of one pool attribute.
///
/// Accepts `2.0` or a list of constraints both from TOML and from Python.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromPyObject)]
#[serde(untagged)]
pub enum ParameterSpec {
    Constant(f64),
    Piecewise(Vec<Constraint>),
}

impl ParameterSpec {
    /// Normalise to a list of constraints; a constant is one unbounded constraint.
    pub fn constraints(&self) -> Vec<Constraint> {
        match self {
            Self::Constant(value) => vec![Constraint::always(*value)],
            Self::Piecewise(constraints) => constraints.clone(),
        }
    }

    /// Every configured value, regardless of the dates it applies to.
    pub fn values(&self) -> Vec<f64> {
        match self {
            Self::Constant(value) => vec![*value],
            Self::Piecewise(constraints) => constraints.iter().map(|c| c.value).collect(),
        }
    }
}

impl From<f64> for ParameterSpec {
    fn from(value: f64) -> Self {
        Self::Constant(value)
    }
}

impl From<Vec<Constraint>> for ParameterSpec {
    fn from(constraints: Vec<Constraint>) -> Self {
        Self::Piecewise(constraints)
    }
}

/// Resolve constraints to one value per timeline day.
///
/// Returns `None` when no constraint touches the timeline, i.e. nothing can be
/// filled from.
pub fn resolve_series(constraints: &[Constraint], timeline: &Timeline) -> Option<Vec<f64>> {
    let mut marked: Vec<Option<f64>> = vec![None; timeline.len()];

    for constraint in constraints {
        let start = constraint.effective_start().max(timeline.start());
        let end = constraint.effective_end().min(timeline.end());
        if start > end {
            continue;
        }
        // Both bounds are clamped into the timeline above
        let first = timeline.index_of(start)?;
        let last = timeline.index_of(end)?;
        for slot in &mut marked[first..=last] {
            *slot = Some(constraint.value);
        }
    }

    // Forward fill
    let mut carry = None;
    for slot in marked.iter_mut() {
        match slot {
            Some(value) => carry = Some(*value),
            None => *slot = carry,
        }
    }

    // Backward fill the leading gap
    let first_defined = marked.iter().flatten().next().copied()?;
    Some(
        marked
            .into_iter()
            .map(|slot| slot.unwrap_or(first_defined))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn january() -> Timeline {
        Timeline::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap()
    }

    #[test]
    fn test_constant_fills_everything() {
        let constraints = ParameterSpec::Constant(3.0).constraints();
        let series = resolve_series(&constraints, &january()).unwrap();
        assert_eq!(series.len(), 31);
        assert!(series.iter().all(|v| *v == 3.0));
    }

    #[test]
    fn test_gap_is_forward_filled() {
        let constraints = vec![
            Constraint::between(d(2024, 1, 1), d(2024, 1, 10), 5.0),
            Constraint::between(d(2024, 1, 20), d(2024, 1, 31), 9.0),
        ];
        let series = resolve_series(&constraints, &january()).unwrap();
        for (i, value) in series.iter().enumerate() {
            let day = i + 1;
            let expected = if day >= 20 { 9.0 } else { 5.0 };
            assert_eq!(*value, expected, "day {}", day);
        }
    }

    #[test]
    fn test_leading_gap_is_back_filled() {
        let constraints = vec![Constraint::between(d(2024, 1, 15), d(2024, 1, 20), 4.0)];
        let series = resolve_series(&constraints, &january()).unwrap();
        assert_eq!(series[0], 4.0);
        assert_eq!(series[13], 4.0);
        // Trailing days carry the last value forward
        assert_eq!(series[30], 4.0);
    }

    #[test]
    fn test_later_constraint_wins_on_overlap() {
        let constraints = vec![
            Constraint::always(1.0),
            Constraint::between(d(2024, 1, 5), d(2024, 1, 6), 7.0),
        ];
        let series = resolve_series(&constraints, &january()).unwrap();
        assert_eq!(series[3], 1.0);
        assert_eq!(series[4], 7.0);
        assert_eq!(series[5], 7.0);
        assert_eq!(series[6], 1.0);
    }

    #[test]
    fn test_open_ended_constraints() {
        let constraints = vec![
            Constraint {
                start: None,
                end: Some(d(2024, 1, 10)),
                value: 2.0,
            },
            Constraint {
                start: Some(d(2024, 1, 11)),
                end: None,
                value: 6.0,
            },
        ];
        let series = resolve_series(&constraints, &january()).unwrap();
        assert_eq!(series[9], 2.0);
        assert_eq!(series[10], 6.0);
        assert_eq!(series[30], 6.0);
    }

    #[test]
    fn test_no_constraints_is_unresolvable() {
        assert!(resolve_series(&[], &january()).is_none());
    }

    #[test]
    fn test_constraint_outside_timeline_is_unresolvable() {
        let constraints = vec![Constraint::between(d(2023, 1, 1), d(2023, 1, 31), 2.0)];
        assert!(resolve_series(&constraints, &january()).is_none());
    }

    #[test]
    fn test_spec_deserializes_constant_or_list() {
        #[derive(Deserialize)]
        struct Holder {
            a: ParameterSpec,
            b: ParameterSpec,
        }
        let holder: Holder = toml::from_str(
            r#"
            a = 2.5
            b = [{ start = "2024-01-01", end = "2024-01-10", value = 5.0 }, { value = 1.0 }]
            "#,
        )
        .unwrap();
        assert_eq!(holder.a, ParameterSpec::Constant(2.5));
        match holder.b {
            ParameterSpec::Piecewise(list) => {
                assert_eq!(list.len(), 2);
                assert_eq!(list[0].start, Some(d(2024, 1, 1)));
                assert_eq!(list[1].start, None);
            }
            other => panic!("expected piecewise, got {:?}", other),
        }
    }
}
