//! Persistent property:value cache with multi-key lookup.
//!
//! This crate provides:
//! - `PropertyValueCache` - records indexed by every value of selected
//!   key properties, merged on overlap, persisted to CSV
//! - `Record` / `PropValue` - schema-less property:value records
//! - record helpers: `merge_record()`, `flatten_record()`,
//!   `value_list()`, `normalize_string()`

pub mod cache;
pub mod record;

pub use cache::{CacheOptions, EntryId, PropertyValueCache, DEFAULT_KEY_PROPS};
pub use record::{flatten_record, merge_record, normalize_string, value_list, PropValue, Record};
