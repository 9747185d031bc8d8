//! Hourly aggregation of canonical records.
//!
//! This module buckets records by hour, sums their category counts and
//! densifies the result so every hour of the observed range has a row.

pub mod aggregate;
pub mod types;
pub mod utility;
