//! servocal Hardware Abstraction Layer
//!
//! This crate defines the collaborator traits the calibration engine is
//! written against. A concrete device binding (a vendor library, a network
//! transport, or the in-memory simulator in `servocal-drivers`) implements
//! them, and the same calibration code runs on all of them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (servocal-cli)             │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  servocal-core (PWM, logger, sequencer) │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  servocal-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  simulated    │       │   hardware    │
//! │   device      │       │   binding     │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`register::RegisterPort`], [`register::Device`] - Named register access
//! - [`input::InputSource`] - Operator cancel / continue / direction input
//! - [`clock::Clock`] - Monotonic time, sleeping and wall-clock timestamps

#![deny(unsafe_code)]

pub mod clock;
pub mod input;
pub mod register;
pub mod session;

// Re-export key traits at crate root for convenience
pub use clock::Clock;
pub use input::{Direction, InputSource};
pub use register::{Device, DeviceInfo, DeviceSelector, PortError, RegisterBatch, RegisterPort};
pub use session::Session;
