//! Named counters for tracking metrics across batch operations.
//!
//! Batch imports run unattended over large, messy inputs; failures are
//! absorbed and surfaced through counters instead of errors. Callers
//! inspect the counters after a run to judge data quality.

use std::collections::BTreeMap;
use std::sync::Mutex;

/// A dictionary of named integer counters.
///
/// All methods take `&self`; the map is protected by a mutex so a single
/// `Arc<Counters>` can be shared between a cache and its caller.
pub struct Counters {
    /// Counter values keyed by prefixed name.
    values: Mutex<BTreeMap<String, i64>>,
    /// Prefix prepended to every counter name.
    prefix: String,
}

impl Counters {
    /// Create an empty set of counters with no prefix.
    pub fn new() -> Self {
        Self::with_prefix("")
    }

    /// Create an empty set of counters with the given name prefix.
    ///
    /// # Arguments
    /// * `prefix` - String prepended to every counter name
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            values: Mutex::new(BTreeMap::new()),
            prefix: prefix.into(),
        }
    }

    /// Increment a named counter by the given value, creating it at zero
    /// if it does not exist yet.
    ///
    /// # Arguments
    /// * `name` - Name of the counter to update
    /// * `value` - Value added to the counter (may be negative)
    pub fn add_counter(&self, name: &str, value: i64) {
        let key: String = self.counter_name(name);
        let mut values = self.values.lock().unwrap();
        *values.entry(key).or_insert(0) += value;
    }

    /// Set a counter to the given value, overwriting any previous value.
    ///
    /// # Arguments
    /// * `name` - Name of the counter to set
    /// * `value` - New value for the counter
    pub fn set_counter(&self, name: &str, value: i64) {
        let key: String = self.counter_name(name);
        let mut values = self.values.lock().unwrap();
        values.insert(key, value);
    }

    /// Get the value of a named counter.
    ///
    /// # Arguments
    /// * `name` - Name of the counter to look up
    ///
    /// # Returns
    /// The counter value, or 0 if the counter does not exist.
    pub fn get_counter(&self, name: &str) -> i64 {
        let key: String = self.counter_name(name);
        let values = self.values.lock().unwrap();
        values.get(&key).copied().unwrap_or(0)
    }

    /// Lower a counter to the given value if it is smaller than the
    /// current value (or the counter does not exist).
    ///
    /// # Arguments
    /// * `name` - Name of the counter
    /// * `value` - Candidate minimum value
    pub fn min_counter(&self, name: &str, value: i64) {
        let key: String = self.counter_name(name);
        let mut values = self.values.lock().unwrap();
        values
            .entry(key)
            .and_modify(|v| *v = (*v).min(value))
            .or_insert(value);
    }

    /// Raise a counter to the given value if it is larger than the
    /// current value (or the counter does not exist).
    ///
    /// # Arguments
    /// * `name` - Name of the counter
    /// * `value` - Candidate maximum value
    pub fn max_counter(&self, name: &str, value: i64) {
        let key: String = self.counter_name(name);
        let mut values = self.values.lock().unwrap();
        values
            .entry(key)
            .and_modify(|v| *v = (*v).max(value))
            .or_insert(value);
    }

    /// Get a snapshot of all counters, sorted by name.
    pub fn get_counters(&self) -> BTreeMap<String, i64> {
        self.values.lock().unwrap().clone()
    }

    /// Get the counter name prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Format all counters as a multi-line string, sorted by name.
    pub fn summary_string(&self) -> String {
        let values = self.values.lock().unwrap();
        let mut lines: Vec<String> = Vec::with_capacity(values.len() + 1);
        lines.push("Counters:".to_string());
        for (name, value) in values.iter() {
            lines.push(format!("{:>50} = {:>10}", name, value));
        }
        lines.join("\n")
    }

    /// Emit the counter summary through the logger.
    pub fn log_counters(&self) {
        log::info!("{}", self.summary_string());
    }

    /// Build the full counter name with the prefix.
    fn counter_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}{}", self.prefix, name)
        }
    }
}

impl Default for Counters {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_add_counter() {
        let counters: Counters = Counters::new();
        counters.add_counter("rows", 1);
        counters.add_counter("rows", 10);
        assert_eq!(counters.get_counter("rows"), 11);
    }

    #[test]
    fn test_add_counter_negative() {
        let counters: Counters = Counters::new();
        counters.add_counter("delta", 10);
        counters.add_counter("delta", -4);
        assert_eq!(counters.get_counter("delta"), 6);
    }

    #[test]
    fn test_missing_counter_is_zero() {
        let counters: Counters = Counters::new();
        assert_eq!(counters.get_counter("never-set"), 0);
    }

    #[test]
    fn test_set_counter_overwrites() {
        let counters: Counters = Counters::new();
        counters.set_counter("stage", 1);
        counters.set_counter("stage", 5);
        assert_eq!(counters.get_counter("stage"), 5);
    }

    #[test]
    fn test_min_max_counter() {
        let counters: Counters = Counters::new();
        counters.min_counter("min-size", 10);
        counters.min_counter("min-size", 3);
        counters.min_counter("min-size", 7);
        assert_eq!(counters.get_counter("min-size"), 3);

        counters.max_counter("max-size", 10);
        counters.max_counter("max-size", 25);
        counters.max_counter("max-size", 7);
        assert_eq!(counters.get_counter("max-size"), 25);
    }

    #[test]
    fn test_prefix() {
        let counters: Counters = Counters::with_prefix("load_");
        counters.add_counter("rows", 2);
        assert_eq!(counters.get_counter("rows"), 2);
        assert!(counters.get_counters().contains_key("load_rows"));
    }

    #[test]
    fn test_shared_counters() {
        let counters: Arc<Counters> = Arc::new(Counters::new());
        let clone: Arc<Counters> = counters.clone();
        clone.add_counter("shared", 3);
        assert_eq!(counters.get_counter("shared"), 3);
    }

    #[test]
    fn test_summary_string_sorted() {
        let counters: Counters = Counters::new();
        counters.add_counter("b-counter", 2);
        counters.add_counter("a-counter", 1);
        let summary: String = counters.summary_string();
        let a_pos: usize = summary.find("a-counter").unwrap();
        let b_pos: usize = summary.find("b-counter").unwrap();
        assert!(a_pos < b_pos);
        assert!(summary.starts_with("Counters:"));
    }
}
