//! Command implementations for the CLI
//!
//! - start: Start the estimation server
//! - test: Load everything the server needs and print a summary
//! - estimate: Run one estimate from the command line
//! - import: Seed the SQLite reference database from CSV
//! - config: Configuration display and validation

pub mod config;
pub mod estimate;
pub mod import;
pub mod start;
