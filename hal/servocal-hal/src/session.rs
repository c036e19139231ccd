//! Scoped device connection
//!
//! A [`Session`] owns an opened [`Device`] for the duration of a run and
//! closes it exactly once, either through [`Session::close`] or when the
//! session is dropped on an error path.

use core::time::Duration;
use std::time::Instant;

use log::{debug, info, warn};

use crate::register::{Device, DeviceInfo, DeviceSelector, PortError, RegisterBatch, RegisterPort};

/// Owned device connection with guaranteed release
pub struct Session<D: Device> {
    device: D,
    open: bool,
    /// Upper bound for a single batched register call
    call_bound: Option<Duration>,
}

impl<D: Device> Session<D> {
    /// Open the device matching `selector`
    pub fn open(selector: &DeviceSelector) -> Result<Self, PortError> {
        let device = D::open(selector)?;
        info!("Opened {}", device.info());
        Ok(Self::new(device))
    }

    /// Wrap an already opened device
    pub fn new(device: D) -> Self {
        Self {
            device,
            open: true,
            call_bound: None,
        }
    }

    /// Treat register calls slower than `bound` as [`PortError::Timeout`]
    pub fn with_call_bound(mut self, bound: Duration) -> Self {
        self.call_bound = Some(bound);
        self
    }

    /// Check if the connection is still open
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Describe the underlying device
    pub fn info(&self) -> DeviceInfo {
        self.device.info()
    }

    /// Release the connection
    ///
    /// Safe to call more than once; only the first call reaches the device.
    pub fn close(&mut self) {
        if self.open {
            self.device.close();
            self.open = false;
            debug!("Connection closed");
        }
    }

    fn ensure_open(&self) -> Result<(), PortError> {
        if self.open {
            Ok(())
        } else {
            Err(PortError::Closed)
        }
    }

    fn check_bound<T>(&self, started: Instant, result: Result<T, PortError>) -> Result<T, PortError> {
        let value = result?;
        if let Some(bound) = self.call_bound {
            let elapsed = started.elapsed();
            if elapsed > bound {
                warn!("Register call exceeded bound: {:?} > {:?}", elapsed, bound);
                return Err(PortError::Timeout { elapsed, bound });
            }
        }
        Ok(value)
    }
}

impl<D: Device> RegisterPort for Session<D> {
    fn write_registers(&mut self, batch: &RegisterBatch) -> Result<(), PortError> {
        self.ensure_open()?;
        let started = Instant::now();
        let result = self.device.write_registers(batch);
        self.check_bound(started, result)
    }

    fn read_registers(&mut self, names: &[String]) -> Result<Vec<f64>, PortError> {
        self.ensure_open()?;
        let started = Instant::now();
        let result = self.device.read_registers(names);
        self.check_bound(started, result)
    }
}

impl<D: Device> Drop for Session<D> {
    fn drop(&mut self) {
        self.close();
    }
}
