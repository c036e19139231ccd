//! Calibration run executor
//!
//! Drives the PWM controller and the sample logger through a plan (or live
//! operator input) on a single thread. All waiting is cooperative polling:
//! each tick checks for cancel, checks the wait bound, takes one sample and
//! sleeps. Whatever way a run ends, PWM is disabled and the connection is
//! released exactly once.

use core::mem::discriminant;
use core::time::Duration;
use std::path::PathBuf;

use log::{debug, error, info, trace, warn};
use servocal_hal::{Clock, Device, Direction, InputSource, Session};

use super::edge::DirectionTracker;
use crate::config::{AnglePresets, CalibrationConfig};
use crate::error::{Error, Result};
use crate::logger::SampleLogger;
use crate::plan::Plan;
use crate::pwm::{check_angle, PwmController};
use crate::state::{SequencerEvent, SequencerState};

/// Tunables of the polling loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequencerSettings {
    /// Polling tick
    pub tick: Duration,
    /// Hold each finished step until the operator confirms
    pub confirm_between_steps: bool,
    /// Angles for directional targets
    pub presets: AnglePresets,
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(50),
            confirm_between_steps: false,
            presets: AnglePresets::default(),
        }
    }
}

impl SequencerSettings {
    pub fn from_config(config: &CalibrationConfig) -> Self {
        Self {
            tick: Duration::from_millis(config.sampling.poll_interval_ms.max(1)),
            confirm_between_steps: config.run.confirm_between_steps,
            presets: config.presets,
        }
    }
}

/// How a run that did not fail ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every step finished
    Completed,
    /// The operator cancelled
    Aborted,
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Plan steps held to their bound, or actuations in interactive runs
    pub steps_completed: usize,
    pub samples_written: usize,
    pub log_path: PathBuf,
}

/// What ends a wait
#[derive(Debug, Clone, Copy)]
enum WaitLimit {
    /// Step duration elapsed
    For(Duration),
    /// Operator confirmed
    UntilContinue,
    /// Only a cancel ends it
    UntilCancel,
}

/// Owns the connection and drives one calibration run
pub struct CalibrationSequencer<D: Device, I: InputSource, C: Clock> {
    session: Session<D>,
    pwm: PwmController,
    logger: SampleLogger,
    input: I,
    clock: C,
    settings: SequencerSettings,
    state: SequencerState,
    steps_completed: usize,
}

impl<D: Device, I: InputSource, C: Clock> CalibrationSequencer<D, I, C> {
    pub fn new(
        session: Session<D>,
        pwm: PwmController,
        logger: SampleLogger,
        input: I,
        clock: C,
        settings: SequencerSettings,
    ) -> Self {
        Self {
            session,
            pwm,
            logger,
            input,
            clock,
            settings,
            state: SequencerState::Idle,
            steps_completed: 0,
        }
    }

    /// Current run state
    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn session(&self) -> &Session<D> {
        &self.session
    }

    pub fn logger(&self) -> &SampleLogger {
        &self.logger
    }

    /// Hold each step for its duration
    ///
    /// Used for inline timed plans and imported CSV plans.
    pub fn run_timed(&mut self, plan: &Plan) -> Result<RunReport> {
        let result = self
            .check_plan(plan)
            .and_then(|()| self.run_plan(plan, false));
        self.finish(result)
    }

    /// Hold each step until the operator confirms
    pub fn run_manual(&mut self, plan: &Plan) -> Result<RunReport> {
        let result = self
            .check_plan(plan)
            .and_then(|()| self.run_plan(plan, true));
        self.finish(result)
    }

    /// Follow up/down input until cancelled
    pub fn run_interactive(&mut self) -> Result<RunReport> {
        let presets = self.settings.presets;
        let result = [presets.up, presets.down, presets.neutral]
            .into_iter()
            .try_for_each(|angle| check_angle(self.pwm.config(), angle))
            .map_err(Error::from)
            .and_then(|()| self.interactive_loop());
        self.finish(result)
    }

    /// Sample until cancelled, never actuating
    pub fn run_monitor(&mut self) -> Result<RunReport> {
        info!("Monitoring, cancel to stop");
        self.apply(SequencerEvent::BeginMonitor);
        let result = self.hold(WaitLimit::UntilCancel, None).map(|_| ());
        self.finish(result)
    }

    /// Reject the plan before anything is written
    fn check_plan(&self, plan: &Plan) -> Result<()> {
        plan.check_angles(self.pwm.config(), &self.settings.presets)?;
        Ok(())
    }

    fn run_plan(&mut self, plan: &Plan, confirm_each: bool) -> Result<()> {
        for (index, step) in plan.steps().iter().enumerate() {
            let angle = step.target.resolve(&self.settings.presets);
            let limit = if confirm_each {
                info!("Step {}/{}: {}°, continue when ready", index + 1, plan.len(), angle);
                WaitLimit::UntilContinue
            } else {
                let hold = step.duration().unwrap_or_default();
                info!("Step {}/{}: {}° for {:?}", index + 1, plan.len(), angle, hold);
                WaitLimit::For(hold)
            };

            self.actuate(index, angle)?;
            if !self.hold(limit, Some(angle))? {
                return Ok(());
            }

            self.pwm.disable(&mut self.session)?;
            self.steps_completed += 1;

            let await_continue = self.settings.confirm_between_steps;
            self.apply(SequencerEvent::StepFinished { await_continue });
            if await_continue {
                info!("Step {} done, continue when ready", index + 1);
                if !self.hold(WaitLimit::UntilContinue, Some(angle))? {
                    return Ok(());
                }
                self.apply(SequencerEvent::Continue);
            }
        }

        self.apply(SequencerEvent::PlanExhausted);
        info!("Plan complete");
        Ok(())
    }

    fn interactive_loop(&mut self) -> Result<()> {
        let mut tracker = DirectionTracker::new();
        let mut label = self.settings.presets.resolve(Direction::Neutral);
        self.actuate(0, label)?;
        self.steps_completed = 1;
        info!("Interactive: hold up/down to move, cancel to stop");

        loop {
            if self.cancel_requested() {
                return Ok(());
            }

            let up = self.input.is_held(Direction::Up);
            let down = self.input.is_held(Direction::Down);
            if let Some(direction) = tracker.update(up, down) {
                label = self.settings.presets.resolve(direction);
                debug!("Commanding {:?} ({}°)", direction, label);
                self.actuate(self.steps_completed, label)?;
                self.steps_completed += 1;
            }

            self.sample(Some(label))?;
            self.pause(self.settings.tick);
        }
    }

    fn actuate(&mut self, step: usize, angle: f64) -> Result<()> {
        self.apply(SequencerEvent::BeginStep(step));
        self.pwm.set_angle(&mut self.session, angle)?;
        self.apply(SequencerEvent::Actuated);
        Ok(())
    }

    /// Poll until `limit` is reached; returns false when cancelled
    fn hold(&mut self, limit: WaitLimit, label: Option<f64>) -> Result<bool> {
        let started = self.clock.elapsed();
        loop {
            if self.cancel_requested() {
                return Ok(false);
            }

            let waited = self.clock.elapsed().saturating_sub(started);
            let remaining = match limit {
                WaitLimit::For(bound) if waited >= bound => return Ok(true),
                WaitLimit::For(bound) => bound - waited,
                WaitLimit::UntilContinue if self.input.continue_requested() => return Ok(true),
                WaitLimit::UntilContinue | WaitLimit::UntilCancel => self.settings.tick,
            };

            self.sample(label)?;
            self.pause(remaining.min(self.settings.tick));
        }
    }

    fn cancel_requested(&mut self) -> bool {
        if self.input.cancel_requested() {
            info!("Cancel requested");
            self.apply(SequencerEvent::CancelRequested);
            true
        } else {
            false
        }
    }

    fn sample(&mut self, label: Option<f64>) -> Result<()> {
        if !self.state.sampling_allowed() {
            trace!("No sample in {:?}", self.state);
            return Ok(());
        }
        let now = self.clock.wall_time();
        let row = self
            .logger
            .sample_and_append(&mut self.session, label, now)?;
        info!("{}", row);
        Ok(())
    }

    fn pause(&mut self, duration: Duration) {
        self.clock.sleep(duration);
        self.apply(SequencerEvent::Tick(duration));
    }

    fn apply(&mut self, event: SequencerEvent) {
        let next = self.state.transition(event);
        if discriminant(&next) != discriminant(&self.state) {
            debug!("{:?} -> {:?} on {:?}", self.state, next, event);
        }
        self.state = next;
    }

    /// Record a fault, shut down, and build the report
    fn finish(&mut self, result: Result<()>) -> Result<RunReport> {
        if let Err(err) = &result {
            if err.is_io() {
                match self.state.step() {
                    Some(step) => error!("Run failed in step {}: {}", step + 1, err),
                    None => error!("Run failed: {}", err),
                }
                self.apply(SequencerEvent::HardwareFault);
            }
        }

        self.shutdown();
        result?;

        let outcome = match self.state {
            SequencerState::Aborted => RunOutcome::Aborted,
            _ => RunOutcome::Completed,
        };
        Ok(RunReport {
            outcome,
            steps_completed: self.steps_completed,
            samples_written: self.logger.rows_written(),
            log_path: self.logger.path().to_path_buf(),
        })
    }

    fn shutdown(&mut self) {
        if self.pwm.needs_disable() {
            if let Err(err) = self.pwm.disable(&mut self.session) {
                warn!("PWM disable on shutdown failed: {}", err);
            }
        }
        self.session.close();
    }
}
