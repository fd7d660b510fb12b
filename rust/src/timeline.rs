//! Inclusive daily timeline that every per-day series is indexed by.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use rustc_hash::FxHashSet;

use crate::config::ConfigError;

/// Ordered sequence of calendar days between two bounds (both inclusive).
///
/// Immutable once constructed. Series resolved against a timeline are keyed by
/// [`Timeline::bounds`] so they can be invalidated when the bounds change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timeline {
    start: NaiveDate,
    end: NaiveDate,
}

impl Timeline {
    /// Create a timeline, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ConfigError> {
        if start > end {
            return Err(ConfigError::InvalidTimeline { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn bounds(&self) -> (NaiveDate, NaiveDate) {
        (self.start, self.end)
    }

    /// Number of days, counting both ends.
    pub fn len(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    /// Never true: a valid timeline always holds at least one day.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Position of `date` in the timeline, if it falls inside it.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        if date < self.start || date > self.end {
            return None;
        }
        Some((date - self.start).num_days() as usize)
    }

    /// Date at position `index`. Panics when out of range.
    #[inline]
    pub fn date_at(&self, index: usize) -> NaiveDate {
        assert!(index < self.len(), "timeline index {} out of range", index);
        self.start + Days::new(index as u64)
    }

    /// Iterate over every day in ascending order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take(self.len())
    }

    pub fn is_weekend(date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Per-day mask: false on weekends and on any of `holidays`.
    pub fn working_days(&self, holidays: &[NaiveDate]) -> Vec<bool> {
        let holidays: FxHashSet<NaiveDate> = holidays.iter().copied().collect();
        self.dates()
            .map(|date| !Self::is_weekend(date) && !holidays.contains(&date))
            .collect()
    }
}
