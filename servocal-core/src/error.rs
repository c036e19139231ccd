//! Error taxonomy
//!
//! - [`ConfigError`]: detected before any register write, no hardware change
//! - [`ConnectionError`]: the device could not be opened
//! - [`IoError`]: a register batch or the log file failed mid-run
//!
//! A malformed plan line is not an error; it becomes a [`ParseWarning`].
//! Cancellation is not an error either, it is a normal terminal state.

use std::path::PathBuf;

use servocal_hal::PortError;

/// Result type for calibration operations
pub type Result<T> = core::result::Result<T, Error>;

/// Invalid configuration or plan
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Clock parameters produce no usable roll value
    #[error("invalid PWM timing: {0}")]
    InvalidTiming(String),
    /// Angle outside the actuator's travel
    #[error("angle {angle} is outside 0..={max}")]
    InvalidAngle {
        /// Requested angle
        angle: f64,
        /// Maximum allowed angle
        max: f64,
    },
    /// Pulse width range does not fit the PWM period
    #[error("pulse width {min_ms}..{max_ms} ms does not fit a {period_ms} ms period")]
    InvalidPulseWidth {
        /// Pulse width at 0°
        min_ms: f64,
        /// Pulse width at full travel
        max_ms: f64,
        /// PWM period
        period_ms: f64,
    },
    /// Step duration is negative or not a number
    #[error("step {step} has invalid duration {duration_s}")]
    InvalidDuration {
        /// Zero-based step index
        step: usize,
        /// Offending duration
        duration_s: f64,
    },
    /// Sensor channel name does not fit
    #[error("invalid sensor channel `{0}`")]
    InvalidChannel(String),
    /// Poll interval of zero
    #[error("poll interval must be at least 1 ms")]
    InvalidPollInterval,
    /// No sensor channels to sample
    #[error("no sensor channels configured")]
    NoChannels,
    /// Plan has no usable steps
    #[error("plan contains no valid steps")]
    EmptyPlan,
    /// Plan file could not be read
    #[error("cannot read plan file {path}: {reason}")]
    PlanFile {
        /// Plan file path
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },
}

/// The device could not be opened
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot open device {selector}: {source}")]
pub struct ConnectionError {
    /// Selector that was tried
    pub selector: String,
    /// Failure reported by the binding
    #[source]
    pub source: PortError,
}

/// Mid-run I/O failure
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// A register write batch failed
    #[error("register write failed: {0}")]
    WriteFailed(#[source] PortError),
    /// A sensor read batch failed
    #[error("sensor sample failed: {0}")]
    SampleFailed(#[source] PortError),
    /// Operator input could not be set up
    #[error("operator input unavailable: {0}")]
    Input(#[source] std::io::Error),
    /// The sample log could not be written
    #[error("log file {path}: {source}")]
    Log {
        /// Log file path
        path: PathBuf,
        /// Filesystem failure
        #[source]
        source: std::io::Error,
    },
}

/// Any failure of a calibration run
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration or plan
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Device could not be opened
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    /// Register or log failure during the run
    #[error(transparent)]
    Io(#[from] IoError),
}

impl Error {
    /// Check if this error came from the device or the log mid-run
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}

/// A plan line that was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// One-based line number
    pub line: usize,
    /// Line content
    pub content: String,
    /// Why it was skipped
    pub reason: &'static str,
}
