//! Local file helpers for pvcache.
//!
//! This crate provides the file collaborators the cache depends on:
//! - `resolve_matching()` / `resolve_save_path()` - glob pattern resolution
//! - `load_csv_dict()` / `write_csv_dict()` - header-keyed CSV row I/O
//! - `FileIoError` - shared error type

pub mod csv_dict;
pub mod error;
pub mod glob;

pub use csv_dict::{load_csv_dict, write_csv_dict, CsvTable};
pub use error::FileIoError;
pub use glob::{has_glob_meta, resolve_matching, resolve_save_path};
