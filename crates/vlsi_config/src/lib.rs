//! Parsing and validation of `vlsi.toml` run configuration files.
//!
//! This crate reads the flat option table that drives a physical-design run
//! (placer/legaliser/router/STA tuning, I/O file paths, and the run seed)
//! and produces a strongly-typed [`PhysicalDesignConfig`].

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use types::*;
