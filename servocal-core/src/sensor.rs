//! Analog input channel setup
//!
//! Channels are sampled with the device's current settings unless the
//! configuration overrides them. Overrides are written once, as one batch,
//! before a run starts.

use log::{debug, info};
use servocal_hal::{RegisterBatch, RegisterPort};

use crate::config::SensorChannel;
use crate::error::IoError;

/// Batch applying every configured analog setting, in channel order
pub fn channel_setup_batch(channels: &[SensorChannel]) -> RegisterBatch {
    let mut batch = RegisterBatch::new();
    for channel in channels {
        let name = channel.name.as_str();
        if let Some(negative) = channel.negative_channel {
            batch.push(format!("{}_NEGATIVE_CH", name), f64::from(negative));
        }
        if let Some(settling) = channel.settling_us {
            batch.push(format!("{}_SETTLING_US", name), settling);
        }
        if let Some(range) = channel.range_v {
            batch.push(format!("{}_RANGE", name), range);
        }
        if let Some(index) = channel.resolution_index {
            batch.push(format!("{}_RESOLUTION_INDEX", name), f64::from(index));
        }
    }
    batch
}

/// Apply analog settings, skipping the write when nothing is overridden
pub fn configure_channels<P: RegisterPort>(
    port: &mut P,
    channels: &[SensorChannel],
) -> Result<(), IoError> {
    let batch = channel_setup_batch(channels);
    if batch.is_empty() {
        debug!("No analog overrides configured");
        return Ok(());
    }
    debug!("Analog setup: {}", batch);
    port.write_registers(&batch).map_err(IoError::WriteFailed)?;
    info!("Configured {} analog setting(s)", batch.len());
    Ok(())
}
