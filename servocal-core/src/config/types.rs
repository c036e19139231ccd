//! Configuration type definitions
//!
//! These types describe one calibration bench: which device to open, how the
//! PWM output is wired and scaled, which analog channels to sample and how a
//! run is driven. The application loads them from TOML; every struct has a
//! usable default so a config file only needs to name what differs.

use core::fmt;
use core::str::FromStr;
use std::path::PathBuf;

use heapless::String;
use servocal_hal::{DeviceSelector, Direction};

use crate::error::ConfigError;
use crate::plan::CalibrationStep;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum sensor channel name length
pub const MAX_CHANNEL_NAME_LEN: usize = 16;

/// Maximum sensor channels sampled in one run
pub const MAX_SENSOR_CHANNELS: usize = 16;

/// Bounded sensor channel name (e.g. "AIN0")
pub type ChannelName = String<MAX_CHANNEL_NAME_LEN>;

/// A digital I/O line used for PWM output or counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct DioChannel(pub u8);

impl DioChannel {
    /// Name of a per-line extended-feature register, e.g. `DIO2_EF_ENABLE`
    pub fn register(&self, suffix: &str) -> std::string::String {
        format!("DIO{}_{}", self.0, suffix)
    }
}

impl fmt::Display for DioChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DIO{}", self.0)
    }
}

/// PWM output configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PwmConfig {
    /// Device core clock (Hz)
    pub core_clock_hz: u64,
    /// Clock divisor applied to the core clock
    pub clock_divisor: u32,
    /// PWM frequency (Hz)
    pub desired_frequency_hz: u32,
    /// Line carrying the PWM signal
    pub output_channel: DioChannel,
    /// Optional line armed as a high-speed counter while PWM is enabled
    pub counter_channel: Option<DioChannel>,
    /// Pulse width commanding 0° (ms)
    pub pulse_min_ms: f64,
    /// Pulse width commanding `max_angle_deg` (ms)
    pub pulse_max_ms: f64,
    /// Full travel of the actuator (degrees)
    pub max_angle_deg: f64,
}

impl Default for PwmConfig {
    fn default() -> Self {
        Self {
            core_clock_hz: 80_000_000,
            clock_divisor: 1,
            desired_frequency_hz: 50,
            output_channel: DioChannel(2),
            counter_channel: None,
            pulse_min_ms: 1.0,
            pulse_max_ms: 2.0,
            max_angle_deg: 180.0,
        }
    }
}

impl PwmConfig {
    /// PWM period in milliseconds
    pub fn period_ms(&self) -> f64 {
        1000.0 / f64::from(self.desired_frequency_hz)
    }
}

/// Angles commanded by directional input
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AnglePresets {
    pub up: f64,
    pub down: f64,
    pub neutral: f64,
}

impl Default for AnglePresets {
    fn default() -> Self {
        Self {
            up: 180.0,
            down: 0.0,
            neutral: 90.0,
        }
    }
}

impl AnglePresets {
    /// Angle for a direction
    pub fn resolve(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Neutral => self.neutral,
        }
    }
}

/// An analog input channel to sample
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorChannel {
    /// Register name read for each sample
    pub name: ChannelName,
    /// Input range (±V)
    #[cfg_attr(feature = "serde", serde(default))]
    pub range_v: Option<f64>,
    /// ADC resolution index
    #[cfg_attr(feature = "serde", serde(default))]
    pub resolution_index: Option<u32>,
    /// Negative channel for differential readings
    #[cfg_attr(feature = "serde", serde(default))]
    pub negative_channel: Option<u32>,
    /// Settling time (µs)
    #[cfg_attr(feature = "serde", serde(default))]
    pub settling_us: Option<f64>,
}

impl SensorChannel {
    /// Channel with default analog settings
    pub fn named(name: &str) -> Result<Self, ConfigError> {
        let name =
            ChannelName::try_from(name).map_err(|_| ConfigError::InvalidChannel(name.into()))?;
        Ok(Self {
            name,
            ..Self::default()
        })
    }
}

/// Sampling loop configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SamplingConfig {
    /// Polling tick (ms)
    pub poll_interval_ms: u64,
    /// Directory receiving the CSV logs
    pub output_dir: PathBuf,
    /// Upper bound for one batched register call (ms)
    pub register_timeout_ms: Option<u64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            output_dir: PathBuf::from("."),
            register_timeout_ms: None,
        }
    }
}

/// How a run is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RunMode {
    /// Inline plan, each step held for its duration
    #[cfg_attr(feature = "serde", serde(rename = "timed"))]
    TimedSequence,
    /// Live up/down input
    #[cfg_attr(feature = "serde", serde(rename = "interactive"))]
    Interactive,
    /// Plan loaded from a CSV file
    #[cfg_attr(feature = "serde", serde(rename = "csv"))]
    CsvImport,
    /// Fixed angle list, operator confirms each step
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "manual"))]
    FixedListManual,
    /// Sample only, never actuate
    #[cfg_attr(feature = "serde", serde(rename = "monitor"))]
    Monitor,
}

impl RunMode {
    /// Config/CLI name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::TimedSequence => "timed",
            RunMode::Interactive => "interactive",
            RunMode::CsvImport => "csv",
            RunMode::FixedListManual => "manual",
            RunMode::Monitor => "monitor",
        }
    }

    /// Check if an operator cancel is the normal way this mode ends
    pub fn ends_on_cancel(&self) -> bool {
        matches!(self, RunMode::Interactive | RunMode::Monitor)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = std::string::String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "timed" => Ok(RunMode::TimedSequence),
            "interactive" => Ok(RunMode::Interactive),
            "csv" => Ok(RunMode::CsvImport),
            "manual" => Ok(RunMode::FixedListManual),
            "monitor" => Ok(RunMode::Monitor),
            other => Err(format!(
                "unknown mode `{}` (expected timed, interactive, csv, manual or monitor)",
                other
            )),
        }
    }
}

/// Run selection
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RunConfig {
    /// Run mode
    pub mode: RunMode,
    /// Hold each finished step until the operator confirms
    pub confirm_between_steps: bool,
    /// Inline steps for timed runs
    pub steps: Vec<CalibrationStep>,
    /// Plan file for CSV runs
    pub plan_file: Option<PathBuf>,
    /// How long an interactive direction stays held after its last key
    /// event (ms); must outlast the OS key-repeat delay
    pub hold_window_ms: Option<u64>,
}

/// Complete bench configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CalibrationConfig {
    /// Device to open
    pub device: DeviceSelector,
    /// PWM output
    pub pwm: PwmConfig,
    /// Directional presets
    pub presets: AnglePresets,
    /// Channels to sample
    pub sensors: heapless::Vec<SensorChannel, MAX_SENSOR_CHANNELS>,
    /// Sampling loop
    pub sampling: SamplingConfig,
    /// Run selection
    pub run: RunConfig,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        let sensors = core::iter::once(SensorChannel {
            name: ChannelName::try_from("AIN0").unwrap_or_default(),
            ..SensorChannel::default()
        })
        .collect();
        Self {
            device: DeviceSelector::default(),
            pwm: PwmConfig::default(),
            presets: AnglePresets::default(),
            sensors,
            sampling: SamplingConfig::default(),
            run: RunConfig::default(),
        }
    }
}

impl CalibrationConfig {
    /// Check everything that can be checked without touching hardware
    ///
    /// Plan contents are validated separately when the plan is built, since a
    /// CSV plan is only known after its file is read.
    pub fn validate(&self) -> Result<(), ConfigError> {
        crate::pwm::compute_clock_params(&self.pwm)?;
        crate::pwm::validate_pulse_width(&self.pwm)?;

        for preset in [self.presets.up, self.presets.down, self.presets.neutral] {
            crate::pwm::check_angle(&self.pwm, preset)?;
        }

        if self.sensors.is_empty() {
            return Err(ConfigError::NoChannels);
        }

        if self.sampling.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }

        Ok(())
    }

    /// Sensor channel names in sampling order
    pub fn channel_names(&self) -> Vec<ChannelName> {
        self.sensors.iter().map(|s| s.name.clone()).collect()
    }
}
