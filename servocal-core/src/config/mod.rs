//! Configuration types
//!
//! Device-agnostic bench configuration, deserialized from TOML by the
//! application when the `serde` feature is enabled.

pub mod types;

pub use types::*;
