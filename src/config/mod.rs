//! Harmonizer Configuration Module
//!
//! Batch-run configuration loaded from TOML files.
//!
//! ## Loading Order
//!
//! 1. `LAS_HARMONIZER_CONFIG` environment variable (path to TOML file)
//! 2. `las_harmonizer.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! The loaded config is owned by `main` and passed explicitly to the
//! orchestrator; there is no process-global copy.
//!
//! ```ignore
//! let config = HarmonizerConfig::load();
//! let orchestrator = BatchOrchestrator::new(config, reporter);
//! ```

mod harmonizer_config;
mod validation;
pub mod defaults;

pub use harmonizer_config::*;
pub use validation::{validate_unknown_keys, ValidationWarning};
