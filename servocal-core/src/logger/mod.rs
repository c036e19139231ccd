//! Sample logging

pub mod sample;

pub use sample::{LogMode, SampleLogger, SampleRow};
