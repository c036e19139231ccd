//! Calibration plans
//!
//! A plan is an ordered list of angle + duration steps, given inline in the
//! configuration, imported from a CSV file, or built from a fixed angle list.

pub mod csv_import;
pub mod step;

pub use csv_import::{load_plan, parse_plan, ParsedPlan};
pub use step::{CalibrationStep, Plan, StepTarget, DEFAULT_MANUAL_ANGLES};
