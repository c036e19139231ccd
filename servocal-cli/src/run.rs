//! Run preparation and execution
//!
//! Everything between a loaded configuration and a finished run: checking
//! the configuration, resolving the plan, opening the device, and mapping
//! the result to a process exit code.

use std::path::PathBuf;
use std::time::Duration;

use log::{info, warn};
use servocal_core::config::{CalibrationConfig, RunMode};
use servocal_core::logger::{LogMode, SampleLogger};
use servocal_core::plan::{load_plan, Plan, DEFAULT_MANUAL_ANGLES};
use servocal_core::pwm::PwmController;
use servocal_core::sensor::configure_channels;
use servocal_core::sequencer::{CalibrationSequencer, RunOutcome, RunReport, SequencerSettings};
use servocal_core::{ConfigError, ConnectionError, Error, Result};
use servocal_drivers::SystemClock;
use servocal_hal::{Clock, Device, InputSource, Session};

use crate::plotter;

/// Run completed (or an open-ended run was stopped by the operator)
pub const EXIT_OK: u8 = 0;
/// Device or log failure mid-run
pub const EXIT_FAILURE: u8 = 1;
/// Operator cancelled a plan or declined to start
pub const EXIT_ABORTED: u8 = 2;
/// Invalid configuration or plan
pub const EXIT_CONFIG: u8 = 3;
/// Device could not be opened
pub const EXIT_CONNECTION: u8 = 4;

/// What the sequencer will be asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum RunPlan {
    /// Hold each step for its duration
    Timed(Plan),
    /// Hold each step until the operator confirms
    Manual(Plan),
    /// Follow live up/down input
    Interactive,
    /// Sample only
    Monitor,
}

/// Validate the configuration and resolve the plan for its mode
///
/// Nothing is written to the device before this succeeds.
pub fn prepare(config: &CalibrationConfig) -> core::result::Result<RunPlan, ConfigError> {
    config.validate()?;
    let run = &config.run;

    let plan = match run.mode {
        RunMode::TimedSequence => RunPlan::Timed(Plan::new(run.steps.clone())?),
        RunMode::CsvImport => {
            let path = run.plan_file.as_deref().ok_or_else(|| ConfigError::PlanFile {
                path: PathBuf::new(),
                reason: "csv mode needs a plan file".into(),
            })?;
            let parsed = load_plan(path)?;
            if !parsed.warnings.is_empty() {
                warn!(
                    "{} plan line(s) skipped in {}",
                    parsed.warnings.len(),
                    path.display()
                );
            }
            RunPlan::Timed(parsed.plan)
        }
        RunMode::FixedListManual if run.steps.is_empty() => {
            RunPlan::Manual(Plan::manual_list(&DEFAULT_MANUAL_ANGLES)?)
        }
        RunMode::FixedListManual => RunPlan::Manual(Plan::new(run.steps.clone())?),
        RunMode::Interactive => RunPlan::Interactive,
        RunMode::Monitor => RunPlan::Monitor,
    };

    if let RunPlan::Timed(plan) | RunPlan::Manual(plan) = &plan {
        plan.check_angles(&config.pwm, &config.presets)?;
        info!(
            "{} step(s), {:.1} s of timed holds",
            plan.len(),
            plan.total_duration().as_secs_f64()
        );
    }
    Ok(plan)
}

/// Open the device and drive one run to its end
///
/// `plot` names an external viewer that is started on the log file once it
/// exists.
pub fn execute<D: Device, I: InputSource>(
    config: &CalibrationConfig,
    plan: RunPlan,
    input: I,
    plot: Option<&str>,
) -> Result<RunReport> {
    let pwm = PwmController::new(config.pwm.clone())?;

    let mut session = Session::<D>::open(&config.device).map_err(|source| ConnectionError {
        selector: config.device.to_string(),
        source,
    })?;
    if let Some(ms) = config.sampling.register_timeout_ms {
        session = session.with_call_bound(Duration::from_millis(ms));
    }
    info!("Connected to {}", session.info());

    configure_channels(&mut session, &config.sensors)?;

    let clock = SystemClock::new();
    let logger = SampleLogger::open(
        &config.sampling.output_dir,
        &config.channel_names(),
        LogMode::for_run(config.run.mode),
        clock.wall_time(),
    )?;
    info!("Logging to {}", logger.path().display());

    if let Some(command) = plot {
        plotter::launch(command, logger.path());
    }

    let settings = SequencerSettings::from_config(config);
    let mut sequencer = CalibrationSequencer::new(session, pwm, logger, input, clock, settings);
    match plan {
        RunPlan::Timed(plan) => sequencer.run_timed(&plan),
        RunPlan::Manual(plan) => sequencer.run_manual(&plan),
        RunPlan::Interactive => sequencer.run_interactive(),
        RunPlan::Monitor => sequencer.run_monitor(),
    }
}

/// Map a run result to the process exit code
pub fn exit_code(result: &Result<RunReport>, mode: RunMode) -> u8 {
    match result {
        Ok(report) => match report.outcome {
            RunOutcome::Completed => EXIT_OK,
            RunOutcome::Aborted if mode.ends_on_cancel() => EXIT_OK,
            RunOutcome::Aborted => EXIT_ABORTED,
        },
        Err(Error::Config(_)) => EXIT_CONFIG,
        Err(Error::Connection(_)) => EXIT_CONNECTION,
        Err(Error::Io(_)) => EXIT_FAILURE,
    }
}
