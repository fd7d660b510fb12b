//! Day-indexed table of capacity consumed per pool.

use chrono::NaiveDate;
use std::io::Write;

use crate::timeline::Timeline;

/// Name of the sink column that collects capacity yielded by pools.
pub const UNUSED_COLUMN: &str = "unused";

/// Capacity consumed per pool per day.
///
/// Cells never go negative: subtractions are clamped at zero.
#[derive(Clone, Debug, PartialEq)]
pub struct Roadmap {
    timeline: Timeline,
    columns: Vec<String>,
    /// Column-major: `cells[column][day]`
    cells: Vec<Vec<f64>>,
    /// Surplus with nowhere to go, per day
    unallocated: Vec<f64>,
}

impl Roadmap {
    /// Empty table with one zeroed column per name.
    pub fn new(timeline: Timeline, columns: Vec<String>) -> Self {
        let cells = vec![vec![0.0; timeline.len()]; columns.len()];
        Self {
            timeline,
            cells,
            columns,
            unallocated: vec![0.0; timeline.len()],
        }
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.column_index(name).map(|i| self.cells[i].as_slice())
    }

    /// Cell for `name` on `date`, if both exist.
    pub fn value(&self, name: &str, date: NaiveDate) -> Option<f64> {
        let day = self.timeline.index_of(date)?;
        self.column(name).map(|column| column[day])
    }

    #[inline]
    pub fn get(&self, column: usize, day: usize) -> f64 {
        self.cells[column][day]
    }

    #[inline]
    pub fn set(&mut self, column: usize, day: usize, value: f64) {
        self.cells[column][day] = value.max(0.0);
    }

    #[inline]
    pub fn add(&mut self, column: usize, day: usize, amount: f64) {
        self.set(column, day, self.cells[column][day] + amount);
    }

    #[inline]
    pub fn subtract(&mut self, column: usize, day: usize, amount: f64) {
        self.set(column, day, self.cells[column][day] - amount);
    }

    pub fn unallocated(&self) -> &[f64] {
        &self.unallocated
    }

    pub fn add_unallocated(&mut self, day: usize, amount: f64) {
        self.unallocated[day] += amount.max(0.0);
    }

    /// Write the table as CSV: a `date` column followed by one column per pool.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut out = csv::Writer::from_writer(writer);
        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push("date".to_string());
        header.extend(self.columns.iter().cloned());
        out.write_record(&header)?;

        for (day, date) in self.timeline.dates().enumerate() {
            let mut record = Vec::with_capacity(header.len());
            record.push(date.format("%Y-%m-%d").to_string());
            record.extend(self.cells.iter().map(|column| format!("{}", column[day])));
            out.write_record(&record)?;
        }
        out.flush()?;
        Ok(())
    }
}
