//! Run state machine
//!
//! Every sequencer decision is a function of the current state and an event.
//! `Aborted`, `Complete` and `Failed` are terminal: no event leaves them.

use core::time::Duration;

use super::events::SequencerEvent;

/// Calibration run states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequencerState {
    /// Nothing started yet
    #[default]
    Idle,
    /// Writing the angle for `step`
    Actuating { step: usize },
    /// Holding `step` and sampling; `elapsed` counts time in the step
    Sampling { step: usize, elapsed: Duration },
    /// Step finished, waiting for the operator to confirm
    AwaitingContinue { step: usize },
    /// Cancelled by the operator
    Aborted,
    /// Every step ran to completion
    Complete,
    /// A hardware or log fault stopped the run
    Failed,
}

impl SequencerState {
    /// Check if the run is over
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SequencerState::Aborted | SequencerState::Complete | SequencerState::Failed
        )
    }

    /// Check if samples may be taken in this state
    pub fn sampling_allowed(&self) -> bool {
        matches!(
            self,
            SequencerState::Sampling { .. } | SequencerState::AwaitingContinue { .. }
        )
    }

    /// Step the state is working on, if any
    pub fn step(&self) -> Option<usize> {
        match self {
            SequencerState::Actuating { step }
            | SequencerState::Sampling { step, .. }
            | SequencerState::AwaitingContinue { step } => Some(*step),
            _ => None,
        }
    }

    /// Process an event and return the next state
    pub fn transition(self, event: SequencerEvent) -> Self {
        use SequencerEvent::*;
        use SequencerState::*;

        match (self, event) {
            // Terminal states are sticky
            (Aborted | Complete | Failed, _) => self,

            // Faults and cancellation apply everywhere else
            (_, HardwareFault) => Failed,
            (_, CancelRequested) => Aborted,

            // Starting work
            (Idle, BeginStep(step)) => Actuating { step },
            (Idle, BeginMonitor) => Sampling {
                step: 0,
                elapsed: Duration::ZERO,
            },
            (Idle, PlanExhausted) => Complete,

            // Actuating transitions
            (Actuating { step }, Actuated) => Sampling {
                step,
                elapsed: Duration::ZERO,
            },

            // Sampling transitions
            (Sampling { step, elapsed }, Tick(dt)) => Sampling {
                step,
                elapsed: elapsed + dt,
            },
            (Sampling { step, .. }, StepFinished { await_continue: true }) => {
                AwaitingContinue { step }
            }
            (Sampling { step, .. }, StepFinished { await_continue: false }) => Sampling {
                step,
                elapsed: Duration::ZERO,
            },
            // Interactive runs re-actuate from inside the sampling loop
            (Sampling { .. }, BeginStep(next)) => Actuating { step: next },
            (Sampling { .. }, PlanExhausted) => Complete,

            // AwaitingContinue transitions
            (AwaitingContinue { step }, Continue) => Sampling {
                step,
                elapsed: Duration::ZERO,
            },
            (AwaitingContinue { .. }, BeginStep(next)) => Actuating { step: next },
            (AwaitingContinue { .. }, PlanExhausted) => Complete,

            // Default: stay in current state
            _ => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_flow() {
        let state = SequencerState::Idle.transition(SequencerEvent::BeginStep(0));
        assert_eq!(state, SequencerState::Actuating { step: 0 });

        let state = state.transition(SequencerEvent::Actuated);
        assert!(state.sampling_allowed());

        let state = state.transition(SequencerEvent::Tick(Duration::from_millis(50)));
        assert_eq!(
            state,
            SequencerState::Sampling {
                step: 0,
                elapsed: Duration::from_millis(50)
            }
        );

        let state = state
            .transition(SequencerEvent::StepFinished {
                await_continue: false,
            })
            .transition(SequencerEvent::BeginStep(1));
        assert_eq!(state, SequencerState::Actuating { step: 1 });
    }

    #[test]
    fn test_await_continue() {
        let state = SequencerState::Sampling {
            step: 2,
            elapsed: Duration::from_secs(1),
        }
        .transition(SequencerEvent::StepFinished {
            await_continue: true,
        });
        assert_eq!(state, SequencerState::AwaitingContinue { step: 2 });
        assert!(state.sampling_allowed());

        // Ticks do not restart the step while waiting
        let waiting = state.transition(SequencerEvent::Tick(Duration::from_millis(50)));
        assert_eq!(waiting, state);

        let done = waiting.transition(SequencerEvent::PlanExhausted);
        assert_eq!(done, SequencerState::Complete);
    }

    #[test]
    fn test_cancel_from_any_active_state() {
        let states = [
            SequencerState::Idle,
            SequencerState::Actuating { step: 0 },
            SequencerState::Sampling {
                step: 0,
                elapsed: Duration::ZERO,
            },
            SequencerState::AwaitingContinue { step: 0 },
        ];

        for state in states {
            assert_eq!(
                state.transition(SequencerEvent::CancelRequested),
                SequencerState::Aborted
            );
        }
    }

    #[test]
    fn test_fault_from_actuating() {
        let state = SequencerState::Actuating { step: 3 };
        assert_eq!(
            state.transition(SequencerEvent::HardwareFault),
            SequencerState::Failed
        );
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        for state in [
            SequencerState::Aborted,
            SequencerState::Complete,
            SequencerState::Failed,
        ] {
            assert!(state.is_terminal());
            assert_eq!(state.transition(SequencerEvent::BeginStep(0)), state);
            assert_eq!(state.transition(SequencerEvent::HardwareFault), state);
            assert_eq!(state.transition(SequencerEvent::CancelRequested), state);
        }
    }

    #[test]
    fn test_monitor_start() {
        let state = SequencerState::Idle.transition(SequencerEvent::BeginMonitor);
        assert!(state.sampling_allowed());
        assert_eq!(state.step(), Some(0));
    }
}
