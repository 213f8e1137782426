//! In-memory cache of records indexed by every value of selected key
//! properties, with CSV file persistence.
//!
//! Records naming the same entity through any shared key value are merged
//! into a single entry. Lookups normalize keys by default so "Foo Inc."
//! and "foo inc" resolve to the same entry. Data-quality problems never
//! raise: they are logged and counted, and lookups simply miss.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use pvcache_common::Counters;
use pvcache_fileio::{load_csv_dict, resolve_matching, resolve_save_path, write_csv_dict, CsvTable};

use crate::record::{flatten_record, merge_record, normalize_string, PropValue, Record};

/// Key properties indexed by default, in lookup priority order.
pub const DEFAULT_KEY_PROPS: &[&str] = &["key", "dcid", "placeId", "wikidataId", "name", "place_name"];

/// Stable handle to a cache entry.
pub type EntryId = u64;

/// Configuration for a [`PropertyValueCache`].
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Backing file pattern: a path, a glob, or a comma-separated list.
    /// Empty disables persistence.
    pub filename: String,
    /// Properties to index for lookup, in priority order.
    pub key_props: Vec<String>,
    /// Initial set of known properties. Grows as records introduce more.
    pub props: Vec<String>,
    /// Normalize lookup keys (lowercase, strip punctuation and diacritics).
    pub normalize_keys: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            filename: String::new(),
            key_props: DEFAULT_KEY_PROPS.iter().map(|p| p.to_string()).collect(),
            props: Vec::new(),
            normalize_keys: true,
        }
    }
}

/// A persistent cache of property:value records, indexed by every value
/// of every key property.
///
/// Entries live in an arena keyed by [`EntryId`]; the per-property
/// indexes map normalized key values to entry ids, so one entry is
/// reachable through all of its key values.
pub struct PropertyValueCache {
    filename: String,
    normalize_keys: bool,
    key_props: Vec<String>,
    props: Vec<String>,
    entries: BTreeMap<EntryId, Record>,
    prop_index: HashMap<String, HashMap<String, EntryId>>,
    next_id: EntryId,
    counters: Arc<Counters>,
    modified: bool,
}

impl PropertyValueCache {
    /// Create a cache, loading any existing backing files.
    ///
    /// # Arguments
    /// * `options` - Cache configuration
    pub fn new(options: CacheOptions) -> Self {
        Self::with_counters(options, Arc::new(Counters::new()))
    }

    /// Create a cache reporting into shared counters.
    ///
    /// # Arguments
    /// * `options` - Cache configuration
    /// * `counters` - Counters receiving entry/hit/miss counts
    pub fn with_counters(options: CacheOptions, counters: Arc<Counters>) -> Self {
        let mut cache: PropertyValueCache = Self {
            filename: options.filename,
            normalize_keys: options.normalize_keys,
            key_props: Vec::new(),
            props: Vec::new(),
            entries: BTreeMap::new(),
            prop_index: HashMap::new(),
            next_id: 0,
            counters,
            modified: false,
        };
        cache.register_key_props(&options.key_props);
        cache.register_props(&options.props);
        cache.load_cache_files();
        cache.modified = false;
        cache
    }

    /// Add a record, merging it into an existing entry when any key
    /// property value already resolves to one.
    ///
    /// Every value of every key property of the merged entry is
    /// (re-)indexed. An index slot already held by a different entry is
    /// logged as a conflict and overwritten, so the latest addition wins
    /// that key.
    ///
    /// # Arguments
    /// * `record` - Property:value pairs to add
    ///
    /// # Returns
    /// The entry as stored after the merge.
    pub fn add(&mut self, record: Record) -> &Record {
        let new_props: Vec<String> = record.keys().cloned().collect();
        self.register_props(&new_props);

        let id: EntryId = match self.find_entry_id(&record) {
            Some(id) => id,
            None => {
                let id: EntryId = self.next_id;
                self.next_id += 1;
                self.entries.insert(id, Record::new());
                self.counters.add_counter("pv-cache-entries", 1);
                id
            }
        };

        if let Some(entry) = self.entries.get_mut(&id) {
            merge_record(&record, entry);
        }
        self.index_entry(id);
        self.modified = true;
        log::debug!("Added cache entry {:?}", self.entries.get(&id));
        &self.entries[&id]
    }

    /// Look up the entry for a key value.
    ///
    /// When `prop` is empty or not a key property, every key property
    /// index is probed in priority order. Each probe counts a hit or a
    /// miss against that property.
    ///
    /// # Arguments
    /// * `value` - Lookup value, normalized before probing when enabled
    /// * `prop` - Property to look up by, or "" to try all key properties
    pub fn get_entry(&self, value: &str, prop: &str) -> Option<&Record> {
        let key: String = self.lookup_key(value);
        if prop.is_empty() || !self.key_props.iter().any(|p| p == prop) {
            for key_prop in &self.key_props {
                if let Some(id) = self.prop_key_id(key_prop, &key) {
                    return self.entries.get(&id);
                }
            }
            return None;
        }
        self.prop_key_id(prop, &key)
            .and_then(|id| self.entries.get(&id))
    }

    /// Look up the entry for a property value that may be a list.
    ///
    /// List values cannot be index keys; they are logged as an error and
    /// miss.
    ///
    /// # Arguments
    /// * `value` - Scalar lookup value; lists are rejected
    /// * `prop` - Property to look up by, or "" to try all key properties
    pub fn get_entry_value(&self, value: &PropValue, prop: &str) -> Option<&Record> {
        match value {
            PropValue::One(scalar) => self.get_entry(scalar, prop),
            PropValue::Many(values) => {
                log::error!("Cannot lookup list value {:?} for property {}", values, prop);
                None
            }
        }
    }

    /// Look up the entry matching any key property value in a record.
    ///
    /// Key properties are tried in priority order; for a multi-valued key
    /// property only the first value is probed. The first hit wins.
    ///
    /// # Arguments
    /// * `record` - Record whose key property values identify the entry
    pub fn get_entry_for_dict(&self, record: &Record) -> Option<&Record> {
        self.find_entry_id(record).and_then(|id| self.entries.get(&id))
    }

    /// Save the cache to its backing file if it has unsaved changes.
    ///
    /// The write target is the last existing file matching the configured
    /// pattern, or the literal pattern when nothing matches yet. Entries
    /// are flattened so each row holds one value per key property. A
    /// failed write is logged and leaves the cache dirty; it never raises.
    pub fn save(&mut self) {
        if !self.modified {
            return;
        }
        let path: PathBuf = match resolve_save_path(&self.filename) {
            Some(path) => path,
            None => return,
        };
        let mut rows: Vec<HashMap<String, String>> = Vec::new();
        for entry in self.entries.values() {
            rows.extend(flatten_record(entry, &self.key_props));
        }
        log::info!(
            "Writing {} cache entries as {} rows with columns {:?} into {}",
            self.entries.len(),
            rows.len(),
            self.props,
            path.display()
        );
        match write_csv_dict(&path, &self.props, &rows) {
            Ok(()) => self.modified = false,
            Err(e) => log::error!("Failed to save cache to {}: {}", path.display(), e),
        }
    }

    /// Number of distinct entries.
    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are changes not yet saved.
    pub fn is_dirty(&self) -> bool {
        self.modified
    }

    /// The key properties indexed for lookup, in priority order.
    pub fn key_props(&self) -> &[String] {
        &self.key_props
    }

    /// All known properties, key properties first.
    pub fn props(&self) -> &[String] {
        &self.props
    }

    /// The counters this cache reports into.
    pub fn counters(&self) -> &Arc<Counters> {
        &self.counters
    }

    /// The index key for a lookup value under the configured
    /// normalization.
    ///
    /// # Arguments
    /// * `value` - Raw lookup value
    pub fn lookup_key(&self, value: &str) -> String {
        if self.normalize_keys {
            normalize_string(value)
        } else {
            value.to_string()
        }
    }

    /// Register key properties, creating their indexes.
    fn register_key_props(&mut self, props: &[String]) {
        for prop in props {
            if !self.key_props.iter().any(|p| p == prop) {
                self.key_props.push(prop.clone());
                self.prop_index.entry(prop.clone()).or_default();
            }
            if !self.props.iter().any(|p| p == prop) {
                self.props.push(prop.clone());
            }
        }
    }

    /// Register properties seen in records or file columns.
    ///
    /// Without configured key properties, the first registered property
    /// becomes the key.
    fn register_props(&mut self, props: &[String]) {
        for prop in props {
            if !prop.is_empty() && !self.props.iter().any(|p| p == prop) {
                self.props.push(prop.clone());
            }
        }
        if self.key_props.is_empty() {
            if let Some(first) = self.props.first().cloned() {
                self.register_key_props(&[first]);
            }
        }
    }

    /// Load every file matching the configured pattern into the cache.
    fn load_cache_files(&mut self) {
        let filename: String = self.filename.clone();
        for path in resolve_matching(&filename) {
            let table: CsvTable = match load_csv_dict(&path) {
                Ok(table) => table,
                Err(e) => {
                    log::warn!("Skipping cache file {}: {}", path.display(), e);
                    continue;
                }
            };
            self.register_props(&table.columns);
            let mut num_rows: usize = 0;
            for row in &table.rows {
                let mut record: Record = Record::new();
                for column in &table.columns {
                    match row.get(column) {
                        Some(value) if !value.is_empty() => {
                            record.insert(column.clone(), PropValue::One(value.clone()));
                        }
                        _ => {}
                    }
                }
                if !record.is_empty() {
                    self.add(record);
                    num_rows += 1;
                }
            }
            log::info!(
                "Loaded {} rows with columns {:?} from {}",
                num_rows,
                table.columns,
                path.display()
            );
        }
    }

    /// Find the entry a record resolves to through its key property
    /// values, probing key properties in priority order. Multi-valued key
    /// properties are probed by their first value only.
    fn find_entry_id(&self, record: &Record) -> Option<EntryId> {
        for prop in &self.key_props {
            let value: &str = match record.get(prop).and_then(PropValue::first) {
                Some(value) if !value.is_empty() => value,
                _ => continue,
            };
            let key: String = self.lookup_key(value);
            if let Some(id) = self.prop_key_id(prop, &key) {
                return Some(id);
            }
        }
        None
    }

    /// Probe one property index, counting the hit or miss.
    fn prop_key_id(&self, prop: &str, key: &str) -> Option<EntryId> {
        let id: Option<EntryId> = self
            .prop_index
            .get(prop)
            .and_then(|index| index.get(key))
            .copied();
        match id {
            Some(_) => self
                .counters
                .add_counter(&format!("pv-cache-hits-{}", prop), 1),
            None => self
                .counters
                .add_counter(&format!("pv-cache-misses-{}", prop), 1),
        }
        id
    }

    /// Index every value of every key property of an entry.
    ///
    /// A slot already pointing at a different entry is a key conflict:
    /// logged, then overwritten.
    fn index_entry(&mut self, id: EntryId) {
        let entry: &Record = match self.entries.get(&id) {
            Some(entry) => entry,
            None => return,
        };
        let normalize: bool = self.normalize_keys;
        for prop in &self.key_props {
            let values: &PropValue = match entry.get(prop) {
                Some(values) => values,
                None => continue,
            };
            for value in values.as_slice() {
                if value.is_empty() {
                    continue;
                }
                let key: String = if normalize {
                    normalize_string(value)
                } else {
                    value.clone()
                };
                let index: &mut HashMap<String, EntryId> =
                    self.prop_index.entry(prop.clone()).or_default();
                if let Some(&existing) = index.get(&key) {
                    if existing != id {
                        log::error!(
                            "Conflicting entries for {}:{}, old: {:?}, new: {:?}",
                            prop,
                            key,
                            self.entries.get(&existing),
                            entry
                        );
                    }
                }
                index.insert(key, id);
            }
        }
    }
}

impl Drop for PropertyValueCache {
    /// Persist unsaved changes when the cache goes out of scope.
    fn drop(&mut self) {
        self.save();
    }
}
