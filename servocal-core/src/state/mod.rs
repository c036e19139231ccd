//! State machine for a calibration run
//!
//! The state machine is explicit, finite, and deterministic.

pub mod events;
pub mod machine;

pub use events::SequencerEvent;
pub use machine::SequencerState;
