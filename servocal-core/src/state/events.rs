//! Events that drive a calibration run

use core::time::Duration;

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerEvent {
    // Plan events
    /// Start actuating step `n` (zero-based)
    BeginStep(usize),
    /// Start a sample-only run
    BeginMonitor,
    /// The step angle was written to the device
    Actuated,
    /// One polling tick passed
    Tick(Duration),
    /// The step's wait bound was reached
    StepFinished {
        /// Hold the step until the operator confirms
        await_continue: bool,
    },
    /// No steps remain
    PlanExhausted,

    // Operator events
    /// Operator confirmed "continue"
    Continue,
    /// Operator asked to abort
    CancelRequested,

    // Fault events
    /// A register batch or the log failed
    HardwareFault,
}
