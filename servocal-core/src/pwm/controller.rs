//! Register-level PWM controller
//!
//! Programs the device clock and a DIO extended feature to emit a servo
//! pulse train. Every change is a single batched write so the device never
//! sees half of a configuration.

use log::{debug, warn};
use servocal_hal::{RegisterBatch, RegisterPort};

use super::timing::{check_angle, compute_clock_params, compute_duty_cycle, ClockParams};
use crate::config::PwmConfig;
use crate::error::{ConfigError, IoError};

/// Clock 0 divisor register
pub const CLOCK0_DIVISOR: &str = "DIO_EF_CLOCK0_DIVISOR";
/// Clock 0 roll value register
pub const CLOCK0_ROLL_VALUE: &str = "DIO_EF_CLOCK0_ROLL_VALUE";
/// Clock 0 enable register
pub const CLOCK0_ENABLE: &str = "DIO_EF_CLOCK0_ENABLE";

/// Extended feature index for PWM output
const EF_INDEX_PWM_OUT: f64 = 0.0;
/// Extended feature index for the high-speed counter
const EF_INDEX_COUNTER: f64 = 7.0;

/// Output state as last commanded
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PwmState {
    /// Clock and feature off
    Disabled,
    /// Emitting the pulse for `angle`
    Enabled { angle: f64 },
}

/// PWM output on one DIO line
pub struct PwmController {
    config: PwmConfig,
    clock: ClockParams,
    state: PwmState,
    /// Set once a write has been attempted; cleared by a successful disable
    dirty: bool,
}

impl PwmController {
    /// Create a controller, validating timing before anything is written
    pub fn new(config: PwmConfig) -> Result<Self, ConfigError> {
        let clock = compute_clock_params(&config)?;
        super::timing::validate_pulse_width(&config)?;
        debug!(
            "PWM on {}: tick {} Hz, roll {}",
            config.output_channel, clock.tick_rate_hz, clock.roll_value
        );
        Ok(Self {
            config,
            clock,
            state: PwmState::Disabled,
            dirty: false,
        })
    }

    /// Current output state
    pub fn state(&self) -> PwmState {
        self.state
    }

    pub fn config(&self) -> &PwmConfig {
        &self.config
    }

    /// Check if the output may be live and should be disabled on shutdown
    pub fn needs_disable(&self) -> bool {
        self.dirty
    }

    /// Build the batch that enables output at `angle`
    pub fn enable_batch(&self, angle: f64) -> Result<RegisterBatch, ConfigError> {
        check_angle(&self.config, angle)?;
        let duty = compute_duty_cycle(&self.config, angle);
        let compare = self.clock.compare_value(duty);
        let out = self.config.output_channel;

        let mut batch = RegisterBatch::new();
        batch
            .push(CLOCK0_DIVISOR, f64::from(self.config.clock_divisor))
            .push(CLOCK0_ROLL_VALUE, f64::from(self.clock.roll_value))
            .push(out.register("EF_INDEX"), EF_INDEX_PWM_OUT)
            .push(out.register("EF_CLOCK_SOURCE"), 0.0)
            .push(out.register("EF_CONFIG_A"), f64::from(compare))
            .push(out.register("EF_ENABLE"), 1.0);
        if let Some(counter) = self.config.counter_channel {
            batch
                .push(counter.register("EF_INDEX"), EF_INDEX_COUNTER)
                .push(counter.register("EF_ENABLE"), 1.0);
        }
        batch.push(CLOCK0_ENABLE, 1.0);
        Ok(batch)
    }

    /// Build the batch that turns the output off
    pub fn disable_batch(&self) -> RegisterBatch {
        let mut batch = RegisterBatch::new();
        batch
            .push(CLOCK0_ENABLE, 0.0)
            .push(self.config.output_channel.register("EF_ENABLE"), 0.0);
        if let Some(counter) = self.config.counter_channel {
            batch.push(counter.register("EF_ENABLE"), 0.0);
        }
        batch
    }

    /// Command the actuator to `angle`
    ///
    /// Invalid angles fail before any write. If the write fails, a best-effort
    /// disable is attempted and the controller stays `Disabled`.
    pub fn set_angle<P: RegisterPort>(&mut self, port: &mut P, angle: f64) -> crate::Result<()> {
        let batch = self.enable_batch(angle)?;
        debug!("PWM enable: {}", batch);

        self.dirty = true;
        match port.write_registers(&batch) {
            Ok(()) => {
                self.state = PwmState::Enabled { angle };
                Ok(())
            }
            Err(err) => {
                self.state = PwmState::Disabled;
                if let Err(disable_err) = self.disable(port) {
                    warn!("PWM disable after failed enable also failed: {}", disable_err);
                }
                Err(IoError::WriteFailed(err).into())
            }
        }
    }

    /// Turn the output off
    ///
    /// Idempotent and valid in any state.
    pub fn disable<P: RegisterPort>(&mut self, port: &mut P) -> Result<(), IoError> {
        let batch = self.disable_batch();
        debug!("PWM disable: {}", batch);
        self.state = PwmState::Disabled;
        port.write_registers(&batch).map_err(IoError::WriteFailed)?;
        self.dirty = false;
        Ok(())
    }
}
