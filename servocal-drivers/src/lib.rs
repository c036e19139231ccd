//! Concrete collaborator implementations
//!
//! This crate provides implementations of the traits defined in
//! servocal-hal for running on a host:
//!
//! - [`sim::SimulatedDevice`] - in-memory register device with a synthetic servo and sensors
//! - [`terminal::TerminalInput`] - keyboard input through crossterm
//! - [`clock::SystemClock`] - monotonic clock, thread sleep and local wall time

#![deny(unsafe_code)]

pub mod clock;
pub mod sim;
pub mod terminal;

pub use clock::SystemClock;
pub use sim::SimulatedDevice;
pub use terminal::TerminalInput;
