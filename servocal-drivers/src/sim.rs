//! Simulated register device
//!
//! Keeps registers in memory and models a standard hobby servo (1-2 ms pulse
//! over 180°) on whichever DIO line is configured for PWM output. Analog
//! inputs report a potentiometer-like voltage derived from the servo
//! position, so a dry run produces a plausible calibration curve.

use std::collections::BTreeMap;

use log::{debug, trace};
use servocal_hal::{Device, DeviceInfo, DeviceSelector, PortError, RegisterBatch, RegisterPort};

/// Serial number reported by the simulator
pub const SIM_SERIAL: u32 = 470_000_001;

/// Core clock the simulated device runs its PWM clock from (Hz)
const CORE_CLOCK_HZ: f64 = 80_000_000.0;

/// Servo pulse at 0° and at full travel (ms)
const SERVO_PULSE_MS: (f64, f64) = (1.0, 2.0);

/// Servo travel (degrees)
const SERVO_TRAVEL_DEG: f64 = 180.0;

/// Sensor output at the two ends of travel (V)
const SENSOR_SPAN_V: (f64, f64) = (0.5, 4.5);

/// In-memory stand-in for a register-programmed DAQ device
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    registers: BTreeMap<String, f64>,
    position_deg: f64,
    open: bool,
    info: DeviceInfo,
}

impl SimulatedDevice {
    /// Create an open device with the servo at mid travel
    pub fn new() -> Self {
        Self {
            registers: BTreeMap::new(),
            position_deg: SERVO_TRAVEL_DEG / 2.0,
            open: true,
            info: DeviceInfo {
                device_type: "T7".into(),
                connection_type: "SIMULATED".into(),
                serial_number: SIM_SERIAL,
                address: None,
            },
        }
    }

    /// Current servo position
    pub fn position_deg(&self) -> f64 {
        self.position_deg
    }

    /// Last written value of a register
    pub fn register(&self, name: &str) -> Option<f64> {
        self.registers.get(name).copied()
    }

    fn ensure_open(&self) -> Result<(), PortError> {
        if self.open {
            Ok(())
        } else {
            Err(PortError::Closed)
        }
    }

    fn value(&self, name: &str) -> f64 {
        self.registers.get(name).copied().unwrap_or(0.0)
    }

    /// Pulse width on the active PWM line, if output is running
    fn pulse_ms(&self) -> Option<f64> {
        if self.value("DIO_EF_CLOCK0_ENABLE") != 1.0 {
            return None;
        }
        let roll = self.value("DIO_EF_CLOCK0_ROLL_VALUE");
        if roll <= 0.0 {
            return None;
        }
        let divisor = self.value("DIO_EF_CLOCK0_DIVISOR").max(1.0);

        let line = (0..=22u8).find(|n| {
            self.value(&format!("DIO{}_EF_ENABLE", n)) == 1.0
                && self.value(&format!("DIO{}_EF_INDEX", n)) == 0.0
        })?;
        let compare = self.value(&format!("DIO{}_EF_CONFIG_A", line));

        let tick_rate = CORE_CLOCK_HZ / divisor;
        Some(compare / tick_rate * 1000.0)
    }

    fn update_position(&mut self) {
        // An unpowered servo holds its last position
        if let Some(pulse) = self.pulse_ms() {
            let (min, max) = SERVO_PULSE_MS;
            let fraction = ((pulse - min) / (max - min)).clamp(0.0, 1.0);
            self.position_deg = fraction * SERVO_TRAVEL_DEG;
            trace!("Simulated servo at {:.1}°", self.position_deg);
        }
    }

    fn sensor_voltage(&self, channel: &str) -> Option<f64> {
        let index: u32 = channel.strip_prefix("AIN")?.parse().ok()?;
        let (low, high) = SENSOR_SPAN_V;
        let fraction = self.position_deg / SERVO_TRAVEL_DEG;
        // Odd channels are wired in reverse
        let volts = if index % 2 == 0 {
            low + (high - low) * fraction
        } else {
            high - (high - low) * fraction
        };

        let range = self.value(&format!("{}_RANGE", channel));
        Some(if range > 0.0 {
            volts.clamp(-range, range)
        } else {
            volts
        })
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

fn is_known(name: &str) -> bool {
    (name.starts_with("DIO") || name.starts_with("AIN"))
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

impl RegisterPort for SimulatedDevice {
    fn write_registers(&mut self, batch: &RegisterBatch) -> Result<(), PortError> {
        self.ensure_open()?;

        // Validate the whole batch before applying any of it
        for (name, value) in batch.iter() {
            if !is_known(name) {
                return Err(PortError::UnknownRegister(name.into()));
            }
            if !value.is_finite() || value < 0.0 {
                return Err(PortError::Rejected {
                    name: name.into(),
                    value,
                });
            }
        }

        for (name, value) in batch.iter() {
            self.registers.insert(name.into(), value);
        }
        debug!("Simulated write: {}", batch);
        self.update_position();
        Ok(())
    }

    fn read_registers(&mut self, names: &[String]) -> Result<Vec<f64>, PortError> {
        self.ensure_open()?;
        names
            .iter()
            .map(|name| {
                if !is_known(name) {
                    return Err(PortError::UnknownRegister(name.clone()));
                }
                Ok(self
                    .sensor_voltage(name)
                    .unwrap_or_else(|| self.value(name)))
            })
            .collect()
    }
}

impl Device for SimulatedDevice {
    fn open(selector: &DeviceSelector) -> Result<Self, PortError> {
        let mut device = Self::new();
        let wanted = selector.identifier.as_str();
        if wanted != "ANY" && wanted != SIM_SERIAL.to_string() {
            return Err(PortError::NotFound(selector.to_string()));
        }
        device.info.connection_type = selector.connection_type.clone();
        Ok(device)
    }

    fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn close(&mut self) {
        self.open = false;
    }
}
