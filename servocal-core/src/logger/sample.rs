//! Append-only CSV sample log
//!
//! One log file per run, named by its creation time. The header is written
//! once when the file is created; every sample appends one row. An existing
//! file is never truncated. If the file disappears mid-run it is recreated
//! with a fresh header and logging continues.

use core::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use csv::{Terminator, WriterBuilder};
use log::{debug, warn};
use servocal_hal::{PortError, RegisterPort};

use crate::config::{ChannelName, RunMode};
use crate::error::{ConfigError, IoError};

/// File name timestamp, sortable and filesystem-safe
const FILE_STAMP_FORMAT: &str = "%Y-%m-%d %H-%M-%S%.3f";
/// Row timestamp with millisecond resolution
const ROW_STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
/// File name prefix for labeled (calibration) logs
const LABELED_PREFIX: &str = "calibration ";

/// Log layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// `Timestamp,<channels>`
    Plain,
    /// `Timestamp,Angle,<channels>`
    Labeled,
}

impl LogMode {
    /// Layout used by a run mode; only monitor runs log without angles
    pub fn for_run(mode: RunMode) -> Self {
        match mode {
            RunMode::Monitor => LogMode::Plain,
            _ => LogMode::Labeled,
        }
    }
}

/// One sampled row
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub timestamp: NaiveDateTime,
    /// Commanded angle, in labeled logs
    pub label: Option<f64>,
    /// Reading per channel, in configured order
    pub values: Vec<(ChannelName, f64)>,
}

impl SampleRow {
    fn record(&self, mode: LogMode) -> Vec<String> {
        let mut fields = Vec::with_capacity(self.values.len() + 2);
        fields.push(self.timestamp.format(ROW_STAMP_FORMAT).to_string());
        if mode == LogMode::Labeled {
            fields.push(self.label.map(|angle| angle.to_string()).unwrap_or_default());
        }
        fields.extend(self.values.iter().map(|(_, value)| format!("{:.4}", value)));
        fields
    }
}

impl fmt::Display for SampleRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.timestamp.format(ROW_STAMP_FORMAT))?;
        if let Some(angle) = self.label {
            write!(f, " [{}°]", angle)?;
        }
        for (name, value) in &self.values {
            write!(f, " {} = {:.4}", name, value)?;
        }
        Ok(())
    }
}

/// Append-only sample log for one run
pub struct SampleLogger {
    path: PathBuf,
    mode: LogMode,
    channels: Vec<ChannelName>,
    /// Register names, read as one batch per sample
    names: Vec<String>,
    rows_written: usize,
}

impl SampleLogger {
    /// Create the log for a run starting at `now`
    ///
    /// The file lands in `dir` as `<stamp>.csv`, or `calibration <stamp>.csv`
    /// in labeled mode.
    pub fn open(
        dir: &Path,
        channels: &[ChannelName],
        mode: LogMode,
        now: NaiveDateTime,
    ) -> crate::Result<Self> {
        if channels.is_empty() {
            return Err(ConfigError::NoChannels.into());
        }

        let prefix = match mode {
            LogMode::Plain => "",
            LogMode::Labeled => LABELED_PREFIX,
        };
        let file_name = format!("{}{}.csv", prefix, now.format(FILE_STAMP_FORMAT));

        let logger = Self {
            path: dir.join(file_name),
            mode,
            channels: channels.to_vec(),
            names: channels.iter().map(|c| c.as_str().to_owned()).collect(),
            rows_written: 0,
        };
        logger.create_if_absent()?;
        Ok(logger)
    }

    /// Resolved log path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended so far
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Header fields for this log
    pub fn header(&self) -> Vec<&str> {
        let mut header = vec!["Timestamp"];
        if self.mode == LogMode::Labeled {
            header.push("Angle");
        }
        header.extend(self.channels.iter().map(|c| c.as_str()));
        header
    }

    /// Read every channel once and append the row
    ///
    /// A read failure is returned as-is; nothing is retried.
    pub fn sample_and_append<P: RegisterPort>(
        &mut self,
        port: &mut P,
        label: Option<f64>,
        now: NaiveDateTime,
    ) -> Result<SampleRow, IoError> {
        let readings = port
            .read_registers(&self.names)
            .map_err(IoError::SampleFailed)?;
        if readings.len() != self.names.len() {
            return Err(IoError::SampleFailed(PortError::Transport(format!(
                "read {} values for {} channels",
                readings.len(),
                self.names.len()
            ))));
        }

        let row = SampleRow {
            timestamp: now,
            label,
            values: self.channels.iter().cloned().zip(readings).collect(),
        };

        let file = match OpenOptions::new().append(true).open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!("Log {} vanished, recreating", self.path.display());
                self.create_if_absent()?;
                OpenOptions::new()
                    .append(true)
                    .open(&self.path)
                    .map_err(|e| self.log_error(e))?
            }
            Err(err) => return Err(self.log_error(err)),
        };

        self.write_record(file, &row.record(self.mode))?;
        self.rows_written += 1;
        Ok(row)
    }

    fn create_if_absent(&self) -> Result<(), IoError> {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => {
                debug!("Created log {}", self.path.display());
                self.write_record(file, &self.header())
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(err) => Err(self.log_error(err)),
        }
    }

    fn write_record<I, T>(&self, file: File, record: I) -> Result<(), IoError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(file);
        writer
            .write_record(record)
            .map_err(|e| self.log_error(io::Error::from(e)))?;
        writer.flush().map_err(|e| self.log_error(e))
    }

    fn log_error(&self, source: io::Error) -> IoError {
        IoError::Log {
            path: self.path.clone(),
            source,
        }
    }
}
