//! Query-count and latency harness for ORM-style persistence patterns.
//!
//! Each run opens a [`db::Session`] against SQLite or PostgreSQL, records every
//! statement it emits through a [`recorder::RecordingScope`], times the work with
//! [`timer::measure_time`] and prints a report.
//!
//! Two workloads are provided:
//! - insert strategies (per-row commits, single commit, `add_all`, bulk saves)
//! - relationship loading (lazy, joined, subquery and select-in loads)

pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod recorder;
pub mod report;
pub mod timer;

pub use error::{HarnessError, Result};
