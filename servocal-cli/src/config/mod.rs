//! Configuration loading
//!
//! Parses the TOML bench configuration and applies command-line overrides.

pub mod loader;

pub use loader::{load_config, Overrides};
