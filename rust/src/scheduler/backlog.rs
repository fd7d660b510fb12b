//! Per-pool backlog of tasks still owing effort.

use crate::interner::TaskKey;

/// Efforts and capacities below this many labor-days snap to zero.
pub const EPSILON: f64 = 0.01;

/// Snap floating residue below [`EPSILON`] to exactly zero.
#[inline]
pub fn snap(value: f64) -> f64 {
    if value < EPSILON {
        0.0
    } else {
        value
    }
}

/// One task's standing in a pool's backlog.
#[derive(Clone, Debug, PartialEq)]
pub struct BacklogEntry {
    pub key: TaskKey,
    pub initial: f64,
    pub remaining: f64,
    /// Sum of work applied so far
    pub applied: f64,
    /// Tasks that must leave every backlog before this one may be worked
    pub blockers: Vec<TaskKey>,
}

impl BacklogEntry {
    pub fn new(key: TaskKey, effort: f64, blockers: Vec<TaskKey>) -> Self {
        Self {
            key,
            initial: effort,
            remaining: effort,
            applied: 0.0,
            blockers,
        }
    }
}

/// Ordered, mutable queue of tasks with nonzero remaining effort in one pool.
///
/// Entries are kept in scheduling order (priority descending, then plan order)
/// and removed exactly once, when their remaining effort reaches zero.
#[derive(Clone, Debug, Default)]
pub struct Backlog {
    entries: Vec<BacklogEntry>,
}

impl Backlog {
    /// Build a backlog from `(entry, priority)` pairs given in plan order.
    ///
    /// Zero-effort entries are dropped; the sort is stable so equal priorities
    /// keep plan order.
    pub fn from_prioritized(entries: Vec<(BacklogEntry, i32)>) -> Self {
        let mut entries: Vec<(BacklogEntry, i32)> = entries
            .into_iter()
            .filter(|(entry, _)| snap(entry.initial) > 0.0)
            .collect();
        entries.sort_by_key(|(_, priority)| std::cmp::Reverse(*priority));
        Self {
            entries: entries.into_iter().map(|(entry, _)| entry).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn get(&self, cursor: usize) -> Option<&BacklogEntry> {
        self.entries.get(cursor)
    }

    /// Apply `work` to the entry at `cursor`, returning its remaining effort.
    pub fn apply(&mut self, cursor: usize, work: f64) -> f64 {
        let entry = &mut self.entries[cursor];
        let work = work.min(entry.remaining);
        entry.applied += work;
        entry.remaining = snap(entry.remaining - work);
        entry.remaining
    }

    /// Remove and return the entry at `cursor`.
    pub fn remove(&mut self, cursor: usize) -> BacklogEntry {
        self.entries.remove(cursor)
    }

    /// Cursor position after `cursor`, wrapping to the start.
    #[inline]
    pub fn next_cursor(&self, cursor: usize) -> usize {
        if cursor + 1 < self.entries.len() {
            cursor + 1
        } else {
            0
        }
    }

    pub fn entries(&self) -> &[BacklogEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: TaskKey, effort: f64) -> BacklogEntry {
        BacklogEntry::new(key, effort, vec![])
    }

    #[test]
    fn test_snap() {
        assert_eq!(snap(0.009), 0.0);
        assert_eq!(snap(-0.5), 0.0);
        assert_eq!(snap(0.01), 0.01);
        assert_eq!(snap(2.0), 2.0);
    }

    #[test]
    fn test_priority_order_is_stable() {
        let backlog = Backlog::from_prioritized(vec![
            (entry(0, 1.0), 1),
            (entry(1, 1.0), 3),
            (entry(2, 1.0), 1),
            (entry(3, 1.0), 3),
        ]);
        let keys: Vec<TaskKey> = backlog.entries().iter().map(|e| e.key).collect();
        assert_eq!(keys, vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_zero_effort_not_queued() {
        let backlog = Backlog::from_prioritized(vec![(entry(0, 0.0), 0), (entry(1, 0.005), 0)]);
        assert!(backlog.is_empty());
    }

    #[test]
    fn test_apply_snaps_residue() {
        let mut backlog = Backlog::from_prioritized(vec![(entry(0, 1.0), 0)]);
        assert_eq!(backlog.apply(0, 0.995), 0.0);
        let applied = backlog.get(0).unwrap().applied;
        assert!((applied - 0.995).abs() < 1e-12);
    }

    #[test]
    fn test_apply_never_overshoots() {
        let mut backlog = Backlog::from_prioritized(vec![(entry(0, 0.5), 0)]);
        assert_eq!(backlog.apply(0, 2.0), 0.0);
        assert_eq!(backlog.get(0).unwrap().applied, 0.5);
    }

    #[test]
    fn test_cursor_wraps() {
        let backlog = Backlog::from_prioritized(vec![(entry(0, 1.0), 0), (entry(1, 1.0), 0)]);
        assert_eq!(backlog.next_cursor(0), 1);
        assert_eq!(backlog.next_cursor(1), 0);
    }
}
