//! Turns large, inconsistently shaped layers of geographic records into a small,
//! deterministic summary that a text-generation consumer can ingest within a
//! fixed size budget.

pub mod config;
pub mod digest;
pub mod error;
pub mod telemetry;
