//! Shared utilities for SBLAR crates.
//!
//! This crate provides common utilities used across the SBLAR workspace,
//! including Polars AnyValue helpers and raw-text numeric parsing.

pub mod polars_utils;

// Re-export commonly used functions at crate root for convenience
pub use polars_utils::{any_to_string, format_numeric, parse_f64};
