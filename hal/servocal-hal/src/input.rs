//! Operator input abstractions
//!
//! The calibration loop never blocks on input. Every query here is a
//! non-blocking poll made once per tick; the concrete source (terminal keys,
//! a signal handler, a UI event queue) is supplied by the application.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Directional command for the actuator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    /// Toward the "up" preset angle
    Up,
    /// Toward the "down" preset angle
    Down,
    /// Rest position
    #[default]
    Neutral,
}

/// Non-blocking operator input
pub trait InputSource {
    /// Check whether the operator asked to abort the run
    ///
    /// Once this returns true the run stops at the next tick boundary.
    fn cancel_requested(&mut self) -> bool;

    /// Check whether the operator confirmed "continue" since the last poll
    ///
    /// Each confirmation is consumed by the poll that observes it.
    fn continue_requested(&mut self) -> bool;

    /// Check whether the given direction is currently held
    fn is_held(&mut self, direction: Direction) -> bool;
}
