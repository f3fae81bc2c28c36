//! Advisor Configuration Module
//!
//! Policy values (risk band tables, timeouts, cache TTLs) loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `AGRI_ADVISOR_CONFIG` environment variable (path to TOML file)
//! 2. `advisor_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded `AdvisorConfig` is handed to each component at construction;
//! there is no process-wide config instance.

mod advisor_config;
pub mod defaults;
pub mod validation;

pub use advisor_config::*;
