//! I/O adapters for the migration pipeline.

pub mod config;
pub mod fetch;
pub mod installer;
pub mod lister;
pub mod process;
pub mod registry;
pub mod resolve;
