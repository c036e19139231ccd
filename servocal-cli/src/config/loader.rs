//! TOML configuration loader
//!
//! Reads the bench configuration from a file, or from the default embedded
//! at compile time when no file is given.

use std::path::{Path, PathBuf};

use log::{debug, info};
use servocal_core::config::{CalibrationConfig, RunMode};

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file could not be read
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The TOML did not describe a valid configuration
    #[error("invalid configuration in {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Parse TOML text into a configuration
pub fn parse_config(text: &str) -> Result<CalibrationConfig, toml::de::Error> {
    toml::from_str(text)
}

/// Load the configuration at `path`, or the embedded default
pub fn load_config(path: Option<&Path>, embedded: &str) -> Result<CalibrationConfig, LoadError> {
    let (text, origin) = match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            let text = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            (text, path.display().to_string())
        }
        None => {
            info!("Using embedded default configuration");
            (embedded.to_owned(), "embedded default".to_owned())
        }
    };

    let config = parse_config(&text).map_err(|source| LoadError::Parse { origin, source })?;
    log_config_summary(&config);
    Ok(config)
}

/// Command-line settings that win over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub mode: Option<RunMode>,
    pub plan_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub poll_interval_ms: Option<u64>,
    pub confirm_between_steps: bool,
}

impl Overrides {
    /// Apply to a loaded configuration
    ///
    /// A plan file without an explicit mode selects a CSV run.
    pub fn apply(self, config: &mut CalibrationConfig) {
        if let Some(plan) = self.plan_file {
            config.run.plan_file = Some(plan);
            if self.mode.is_none() {
                config.run.mode = RunMode::CsvImport;
            }
        }
        if let Some(mode) = self.mode {
            config.run.mode = mode;
        }
        if let Some(dir) = self.output_dir {
            config.sampling.output_dir = dir;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.sampling.poll_interval_ms = ms;
        }
        if self.confirm_between_steps {
            config.run.confirm_between_steps = true;
        }
    }
}

/// Log a summary of the loaded configuration
fn log_config_summary(config: &CalibrationConfig) {
    info!("Configuration loaded ({} run)", config.run.mode);
    debug!("  device {}", config.device);
    debug!(
        "  PWM on {} at {} Hz",
        config.pwm.output_channel, config.pwm.desired_frequency_hz
    );
    debug!("  {} sensor channels", config.sensors.len());
    debug!("  {} inline steps", config.run.steps.len());
    debug!("  output to {}", config.sampling.output_dir.display());
}
