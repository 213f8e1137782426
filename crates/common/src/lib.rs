//! Shared utilities for pvcache crates.
//!
//! This crate provides the metrics sink used across the workspace:
//! - `Counters` - named counters for tracking cache hits, misses and sizes

pub mod counters;

pub use counters::Counters;
