//! Task number interning.
//!
//! Backlogs hold compact integer keys into the shared task table instead of
//! copies of task state.

use rustc_hash::FxHashMap;

use crate::models::pattern_matches;

/// Interned task key (u32 for compact storage and fast hashing).
pub type TaskKey = u32;

/// Maps task numbers to dense integer keys in plan order.
#[derive(Debug, Clone)]
pub struct TaskKeyInterner {
    to_key: FxHashMap<String, TaskKey>,
    from_key: Vec<String>,
}

impl TaskKeyInterner {
    /// Create a new interner with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            to_key: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            from_key: Vec::with_capacity(capacity),
        }
    }

    /// Intern a task number, returning its key.
    /// If already interned, returns the existing key.
    pub fn intern(&mut self, number: &str) -> TaskKey {
        if let Some(&key) = self.to_key.get(number) {
            return key;
        }
        let key = self.from_key.len() as TaskKey;
        self.from_key.push(number.to_string());
        self.to_key.insert(number.to_string(), key);
        key
    }

    #[inline]
    pub fn get(&self, number: &str) -> Option<TaskKey> {
        self.to_key.get(number).copied()
    }

    #[inline]
    pub fn resolve(&self, key: TaskKey) -> Option<&str> {
        self.from_key.get(key as usize).map(|s| s.as_str())
    }

    /// Keys of every interned task number matched by a blocking pattern.
    pub fn keys_matching(&self, pattern: &str) -> Vec<TaskKey> {
        self.from_key
            .iter()
            .enumerate()
            .filter(|(_, number)| pattern_matches(pattern, number))
            .map(|(key, _)| key as TaskKey)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.from_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.from_key.is_empty()
    }
}

impl Default for TaskKeyInterner {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}
