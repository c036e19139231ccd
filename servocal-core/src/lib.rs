//! Device-agnostic core logic for the servo calibration bench
//!
//! This crate contains all calibration logic that does not depend on a
//! specific device binding:
//!
//! - Configuration types and validation
//! - PWM timing math and the register-level PWM controller
//! - Append-only CSV sample logging
//! - Calibration plans and the CSV plan importer
//! - State machine for a calibration run
//! - The calibration sequencer (timed, manual, interactive, monitor runs)
//! - Test doubles for the collaborator traits (`mock` feature)

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod logger;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod plan;
pub mod pwm;
pub mod sensor;
pub mod sequencer;
pub mod state;

pub use error::{ConfigError, ConnectionError, Error, IoError, ParseWarning, Result};
