//! Schema-less records of property:value pairs.
//!
//! A record is an open map from property name to one or more string
//! values. Properties accumulate as partial records are merged; values
//! for a property only ever grow, never get overwritten.

use std::collections::HashMap;

use indexmap::IndexMap;
use unicode_normalization::UnicodeNormalization;

/// One or more values observed for a property.
///
/// Most properties hold a single scalar; merging partial records for the
/// same entity promotes a property to a value list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropValue {
    /// A single scalar value.
    One(String),
    /// Multiple values accumulated across merges, in first-seen order.
    Many(Vec<String>),
}

impl PropValue {
    /// Get the first value, if any.
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::One(value) => Some(value),
            Self::Many(values) => values.first().map(String::as_str),
        }
    }

    /// View the values as a slice.
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::One(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        }
    }

    /// Check whether there is no usable value.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::One(value) => value.is_empty(),
            Self::Many(values) => values.is_empty(),
        }
    }

    /// Build a value from a list, collapsing a single element to a scalar.
    ///
    /// # Arguments
    /// * `values` - Values in first-seen order
    pub fn from_values(mut values: Vec<String>) -> Self {
        if values.len() == 1 {
            Self::One(values.remove(0))
        } else {
            Self::Many(values)
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

impl From<Vec<String>> for PropValue {
    fn from(values: Vec<String>) -> Self {
        Self::Many(values)
    }
}

/// A flat record: property name to scalar-or-list value, in first-seen
/// property order.
pub type Record = IndexMap<String, PropValue>;

/// Get the unique scalar values of a property value, splitting
/// comma-joined scalars.
///
/// # Arguments
/// * `value` - The property value to expand
///
/// # Returns
/// Values in first-seen order with duplicates and empty segments removed.
pub fn value_list(value: &PropValue) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for scalar in value.as_slice() {
        for part in scalar.split(',') {
            if part.is_empty() {
                continue;
            }
            if !values.iter().any(|v| v == part) {
                values.push(part.to_string());
            }
        }
    }
    values
}

/// Merge the properties of `src` into `dst`.
///
/// A property missing from `dst` is set directly. A property present in
/// both has its value lists unioned: values from `src` not already in
/// `dst` are appended, and nothing is ever removed or overwritten.
///
/// # Arguments
/// * `src` - Record supplying new property values
/// * `dst` - Record absorbing them
///
/// # Returns
/// `true` if `dst` changed.
pub fn merge_record(src: &Record, dst: &mut Record) -> bool {
    let mut changed: bool = false;
    for (prop, values) in src {
        if values.is_empty() {
            continue;
        }
        match dst.get(prop) {
            None => {
                dst.insert(prop.clone(), values.clone());
                changed = true;
            }
            Some(existing) if existing.is_empty() => {
                dst.insert(prop.clone(), values.clone());
                changed = true;
            }
            Some(existing) => {
                let mut merged: Vec<String> = value_list(existing);
                let mut added: bool = false;
                for value in value_list(values) {
                    if !merged.iter().any(|v| *v == value) {
                        merged.push(value);
                        added = true;
                    }
                }
                if added {
                    dst.insert(prop.clone(), PropValue::from_values(merged));
                    changed = true;
                }
            }
        }
    }
    changed
}

/// Flatten a record into one or more single-valued rows for tabular
/// serialization.
///
/// Properties in `expand_props` with multiple values are expanded into
/// the cross product of their values, one row per combination, so each
/// output row identifies the record by one value per key property.
/// All other multi-valued properties are comma-joined into a single cell.
///
/// # Arguments
/// * `record` - Record to flatten
/// * `expand_props` - Properties to expand row-wise (the key properties)
///
/// # Returns
/// At least one row; more when an expanded property has multiple values.
pub fn flatten_record(record: &Record, expand_props: &[String]) -> Vec<HashMap<String, String>> {
    let mut base: HashMap<String, String> = HashMap::new();
    for (prop, value) in record {
        if !expand_props.iter().any(|p| p == prop) {
            base.insert(prop.clone(), value.as_slice().join(","));
        }
    }

    let mut rows: Vec<HashMap<String, String>> = vec![base];
    for prop in expand_props {
        let values: &PropValue = match record.get(prop) {
            Some(value) if !value.is_empty() => value,
            _ => continue,
        };
        let mut expanded: Vec<HashMap<String, String>> =
            Vec::with_capacity(rows.len() * values.as_slice().len());
        for value in values.as_slice() {
            for row in &rows {
                let mut with_prop = row.clone();
                with_prop.insert(prop.clone(), value.clone());
                expanded.push(with_prop);
            }
        }
        rows = expanded;
    }
    rows
}

/// Normalize a string for index lookup.
///
/// Applies NFKD decomposition, lowercases, drops every character that is
/// not alphanumeric or a space (this removes punctuation and the
/// combining marks left by decomposition, i.e. diacritics), and
/// collapses whitespace runs.
///
/// # Arguments
/// * `value` - Raw lookup value
pub fn normalize_string(value: &str) -> String {
    let decomposed: String = value.nfkd().collect();
    let lowered: String = decomposed.to_lowercase();
    let filtered: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ')
        .collect();
    filtered.split_whitespace().collect::<Vec<&str>>().join(" ")
}
