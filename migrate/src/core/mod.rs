//! Deterministic, pure logic shared by the migration pipeline.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod listing;
pub mod packages;
pub mod types;
