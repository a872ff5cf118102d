//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads and writes the TOML configuration at the
//! platform-appropriate directory and supplies defaults when the file does
//! not exist yet (first run).

pub mod config;
