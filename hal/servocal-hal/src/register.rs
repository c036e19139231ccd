//! Named register access
//!
//! Devices expose their configuration and measurements as named registers
//! holding `f64` values (`"AIN0"`, `"DIO_EF_CLOCK0_ENABLE"`, ...). Registers
//! are always accessed in batches: a batch either succeeds as a whole or
//! fails, there is no partial-success reporting.

use core::fmt;
use core::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors from register operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortError {
    /// No device matched the selector
    #[error("no device matching {0}")]
    NotFound(String),
    /// The connection has already been closed
    #[error("connection is closed")]
    Closed,
    /// The device does not know this register name
    #[error("unknown register `{0}`")]
    UnknownRegister(String),
    /// The device refused a value
    #[error("register `{name}` rejected value {value}")]
    Rejected {
        /// Register name
        name: String,
        /// Offending value
        value: f64,
    },
    /// The batched call exceeded its time bound
    #[error("register call took {elapsed:?}, bound is {bound:?}")]
    Timeout {
        /// How long the call took
        elapsed: Duration,
        /// Configured bound
        bound: Duration,
    },
    /// Transport-level failure reported by the binding
    #[error("transport error: {0}")]
    Transport(String),
}

/// Selects which device to open
///
/// Mirrors the usual "device type / connection type / identifier" triple,
/// where `"ANY"` matches the first available device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeviceSelector {
    /// Device model (e.g. "T7")
    pub device_type: String,
    /// Connection type ("USB", "ETHERNET", "ANY")
    pub connection_type: String,
    /// Serial number, IP address, name, or "ANY"
    pub identifier: String,
}

impl Default for DeviceSelector {
    fn default() -> Self {
        Self {
            device_type: "T7".into(),
            connection_type: "ANY".into(),
            identifier: "ANY".into(),
        }
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.device_type, self.connection_type, self.identifier
        )
    }
}

/// Information reported by an opened device
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceInfo {
    /// Device model
    pub device_type: String,
    /// Connection used
    pub connection_type: String,
    /// Serial number
    pub serial_number: u32,
    /// Network address, if connected over the network
    pub address: Option<String>,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} over {} (serial {})",
            self.device_type, self.connection_type, self.serial_number
        )?;
        if let Some(addr) = &self.address {
            write!(f, " at {}", addr)?;
        }
        Ok(())
    }
}

/// An ordered batch of register writes
///
/// Names and values are kept in lockstep, so a batch can never carry a
/// different number of names and values. Values are applied in push order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegisterBatch {
    names: Vec<String>,
    values: Vec<f64>,
}

impl RegisterBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a register write
    pub fn push(&mut self, name: impl Into<String>, value: f64) -> &mut Self {
        self.names.push(name.into());
        self.values.push(value);
        self
    }

    /// Register names in write order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Values in write order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of writes in the batch
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if the batch is empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over `(name, value)` pairs in write order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

impl fmt::Display for RegisterBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name, value)?;
            first = false;
        }
        Ok(())
    }
}

/// Batched named-register access
///
/// Implementations must treat each call as atomic with respect to the
/// device: either every register in the call is written/read, or the call
/// fails.
pub trait RegisterPort {
    /// Write every register in the batch, in order
    fn write_registers(&mut self, batch: &RegisterBatch) -> Result<(), PortError>;

    /// Read the named registers, returning one value per name in the same order
    fn read_registers(&mut self, names: &[String]) -> Result<Vec<f64>, PortError>;
}

/// A device connection with an explicit open/close lifetime
///
/// Prefer holding a device through [`crate::Session`], which guarantees the
/// connection is closed exactly once.
pub trait Device: RegisterPort + Sized {
    /// Open a connection to the first device matching `selector`
    fn open(selector: &DeviceSelector) -> Result<Self, PortError>;

    /// Describe the opened device
    fn info(&self) -> DeviceInfo;

    /// Release the connection
    fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_keeps_order() {
        let mut batch = RegisterBatch::new();
        batch.push("A", 1.0).push("B", 2.0).push("C", 3.0);

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.names(), &["A", "B", "C"]);
        assert_eq!(batch.values(), &[1.0, 2.0, 3.0]);
        assert_eq!(batch.to_string(), "A=1, B=2, C=3");
    }

    #[test]
    fn test_selector_display() {
        let selector = DeviceSelector::default();
        assert_eq!(selector.to_string(), "T7/ANY/ANY");
    }
}
