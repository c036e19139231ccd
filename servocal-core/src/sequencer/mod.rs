//! Calibration sequencing
//!
//! - [`executor`]: the run loop for plan, interactive and monitor runs
//! - [`edge`]: held-key edge tracking for interactive runs

pub mod edge;
pub mod executor;

pub use edge::{DirectionTracker, Edge, EdgeDetector};
pub use executor::{CalibrationSequencer, RunOutcome, RunReport, SequencerSettings};
