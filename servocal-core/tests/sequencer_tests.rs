use std::time::Duration;

use servocal_core::config::{ChannelName, PwmConfig};
use servocal_core::logger::{LogMode, SampleLogger};
use servocal_core::mock::{ManualClock, MockPort, ScriptedInput};
use servocal_core::plan::{CalibrationStep, Plan, StepTarget, DEFAULT_MANUAL_ANGLES};
use servocal_core::pwm::PwmController;
use servocal_core::sequencer::{CalibrationSequencer, RunOutcome, SequencerSettings};
use servocal_core::state::SequencerState;
use servocal_core::{ConfigError, Error, IoError};
use servocal_hal::{Clock, Direction, Session};
use tempfile::TempDir;

type TestSequencer = CalibrationSequencer<MockPort, ScriptedInput, ManualClock>;

struct Bench {
    port: MockPort,
    clock: ManualClock,
    dir: TempDir,
}

impl Bench {
    fn new() -> Self {
        Self {
            port: MockPort::new()
                .with_reading("AIN0", 1.5)
                .with_reading("AIN1", -2.25),
            clock: ManualClock::new(),
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn input(&self) -> ScriptedInput {
        ScriptedInput::new(self.clock.clone())
    }

    fn sequencer(
        &self,
        input: ScriptedInput,
        settings: SequencerSettings,
        mode: LogMode,
    ) -> TestSequencer {
        let channels = vec![
            ChannelName::try_from("AIN0").unwrap(),
            ChannelName::try_from("AIN1").unwrap(),
        ];
        let logger =
            SampleLogger::open(self.dir.path(), &channels, mode, self.clock.wall_time()).unwrap();
        CalibrationSequencer::new(
            Session::new(self.port.clone()),
            PwmController::new(PwmConfig::default()).unwrap(),
            logger,
            input,
            self.clock.clone(),
            settings,
        )
    }

    /// Compare values of every enable batch, in write order
    fn commanded_compares(&self) -> Vec<f64> {
        self.port
            .writes()
            .iter()
            .filter_map(|batch| {
                batch
                    .iter()
                    .find(|(name, _)| *name == "DIO2_EF_CONFIG_A")
                    .map(|(_, value)| value)
            })
            .collect()
    }

    fn pwm_is_off(&self) -> bool {
        self.port.register("DIO2_EF_ENABLE") == Some(0.0)
            && self.port.register("DIO_EF_CLOCK0_ENABLE") == Some(0.0)
    }
}

fn timed(steps: &[(f64, f64)]) -> Plan {
    Plan::new(
        steps
            .iter()
            .map(|(angle, secs)| CalibrationStep::new(StepTarget::Angle(*angle), *secs))
            .collect(),
    )
    .unwrap()
}

#[test]
fn test_cancel_interrupts_long_step_within_one_tick() {
    let bench = Bench::new();
    let input = bench.input().cancel_at(Duration::from_secs(2));
    let mut seq = bench.sequencer(input, SequencerSettings::default(), LogMode::Labeled);

    let report = seq.run_timed(&timed(&[(90.0, 10.0)])).unwrap();

    assert_eq!(report.outcome, RunOutcome::Aborted);
    assert_eq!(seq.state(), SequencerState::Aborted);
    assert!(bench.clock.elapsed() <= Duration::from_millis(2050));
    assert!(bench.pwm_is_off());
    assert_eq!(bench.port.close_count(), 1);
}

#[test]
fn test_timed_plan_runs_to_completion() {
    let bench = Bench::new();
    let mut seq = bench.sequencer(bench.input(), SequencerSettings::default(), LogMode::Labeled);

    let report = seq.run_timed(&timed(&[(0.0, 0.2), (180.0, 0.1)])).unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.steps_completed, 2);
    assert_eq!(report.samples_written, 6);
    assert_eq!(seq.state(), SequencerState::Complete);
    assert_eq!(bench.commanded_compares(), vec![80_000.0, 160_000.0]);
    assert!(bench.pwm_is_off());

    let text = std::fs::read_to_string(&report.log_path).unwrap();
    let labels: Vec<&str> = text
        .lines()
        .skip(1)
        .map(|line| line.split(',').nth(1).unwrap())
        .collect();
    assert_eq!(labels, vec!["0", "0", "0", "0", "180", "180"]);
}

#[test]
fn test_failed_enable_never_leaves_pwm_on() {
    let bench = Bench::new();
    bench.port.fail_writes_after(0);
    let mut seq = bench.sequencer(bench.input(), SequencerSettings::default(), LogMode::Labeled);

    let result = seq.run_timed(&timed(&[(90.0, 1.0)]));

    assert!(matches!(result, Err(Error::Io(IoError::WriteFailed(_)))));
    assert_eq!(seq.state(), SequencerState::Failed);
    assert_ne!(bench.port.register("DIO2_EF_ENABLE"), Some(1.0));
    assert_eq!(bench.port.read_count(), 0);
    assert_eq!(seq.logger().rows_written(), 0);
    assert_eq!(bench.port.close_count(), 1);
}

#[test]
fn test_failure_on_second_step_stops_the_run() {
    let bench = Bench::new();
    // Step one enable and disable succeed, step two enable fails
    bench.port.fail_writes_after(2);
    let mut seq = bench.sequencer(bench.input(), SequencerSettings::default(), LogMode::Labeled);

    let result = seq.run_timed(&timed(&[(0.0, 0.1), (180.0, 0.1)]));

    assert!(result.is_err());
    assert_eq!(seq.state(), SequencerState::Failed);
    assert_eq!(seq.logger().rows_written(), 2);
    assert!(bench.pwm_is_off());
}

#[test]
fn test_sample_failure_disables_pwm() {
    let bench = Bench::new();
    bench.port.fail_reads_after(2);
    let mut seq = bench.sequencer(bench.input(), SequencerSettings::default(), LogMode::Labeled);

    let result = seq.run_timed(&timed(&[(45.0, 5.0)]));

    assert!(matches!(result, Err(Error::Io(IoError::SampleFailed(_)))));
    assert_eq!(seq.state(), SequencerState::Failed);
    assert!(bench.pwm_is_off());
    assert_eq!(bench.port.close_count(), 1);
}

#[test]
fn test_invalid_angle_rejected_before_any_write() {
    let bench = Bench::new();
    let mut seq = bench.sequencer(bench.input(), SequencerSettings::default(), LogMode::Labeled);

    let result = seq.run_timed(&timed(&[(90.0, 1.0), (270.0, 1.0)]));

    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidAngle { .. }))
    ));
    assert!(bench.port.writes().is_empty());
    assert_eq!(seq.state(), SequencerState::Idle);
    assert_eq!(bench.port.close_count(), 1);
}

#[test]
fn test_manual_list_waits_for_each_confirmation() {
    let bench = Bench::new();
    let input = bench.input().confirm_every(3);
    let mut seq = bench.sequencer(input, SequencerSettings::default(), LogMode::Labeled);

    let plan = Plan::manual_list(&DEFAULT_MANUAL_ANGLES).unwrap();
    let report = seq.run_manual(&plan).unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.steps_completed, 5);
    assert_eq!(report.samples_written, 10);
    assert_eq!(
        bench.commanded_compares(),
        vec![80_000.0, 120_000.0, 160_000.0, 120_000.0, 80_000.0]
    );
}

#[test]
fn test_confirm_between_steps_holds_with_pwm_off() {
    let bench = Bench::new();
    let input = bench.input().confirm_every(2);
    let settings = SequencerSettings {
        confirm_between_steps: true,
        ..SequencerSettings::default()
    };
    let mut seq = bench.sequencer(input, settings, LogMode::Labeled);

    let report = seq.run_timed(&timed(&[(90.0, 0.1)])).unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    // Two samples while holding, one while awaiting the operator
    assert_eq!(report.samples_written, 3);
    let writes = bench.port.writes();
    assert_eq!(writes[1].names()[0], "DIO_EF_CLOCK0_ENABLE");
    assert_eq!(writes[1].values()[0], 0.0);
}

#[test]
fn test_cancel_while_awaiting_continue() {
    let bench = Bench::new();
    let input = bench.input().cancel_at(Duration::from_millis(300));
    let settings = SequencerSettings {
        confirm_between_steps: true,
        ..SequencerSettings::default()
    };
    let mut seq = bench.sequencer(input, settings, LogMode::Labeled);

    let report = seq.run_timed(&timed(&[(90.0, 0.1), (0.0, 0.1)])).unwrap();

    assert_eq!(report.outcome, RunOutcome::Aborted);
    assert_eq!(report.steps_completed, 1);
    assert_eq!(bench.commanded_compares(), vec![120_000.0]);
}

#[test]
fn test_interactive_follows_edges() {
    let bench = Bench::new();
    let input = bench
        .input()
        .hold(Direction::Up, Duration::from_millis(100)..Duration::from_millis(300))
        .cancel_at(Duration::from_millis(500));
    let mut seq = bench.sequencer(input, SequencerSettings::default(), LogMode::Labeled);

    let report = seq.run_interactive().unwrap();

    assert_eq!(report.outcome, RunOutcome::Aborted);
    assert_eq!(report.steps_completed, 3);
    assert_eq!(report.samples_written, 10);
    assert_eq!(
        bench.commanded_compares(),
        vec![120_000.0, 160_000.0, 120_000.0]
    );
    assert!(bench.pwm_is_off());

    let text = std::fs::read_to_string(&report.log_path).unwrap();
    let labels: Vec<&str> = text
        .lines()
        .skip(1)
        .map(|line| line.split(',').nth(1).unwrap())
        .collect();
    assert_eq!(labels[..2], ["90", "90"]);
    assert_eq!(labels[2..6], ["180", "180", "180", "180"]);
    assert_eq!(labels[6..], ["90", "90", "90", "90"]);
}

#[test]
fn test_monitor_never_touches_pwm() {
    let bench = Bench::new();
    let input = bench.input().cancel_after_polls(3);
    let mut seq = bench.sequencer(input, SequencerSettings::default(), LogMode::Plain);

    let report = seq.run_monitor().unwrap();

    assert_eq!(report.outcome, RunOutcome::Aborted);
    assert_eq!(report.samples_written, 3);
    assert!(bench.port.writes().is_empty());

    let text = std::fs::read_to_string(&report.log_path).unwrap();
    assert_eq!(text.lines().next(), Some("Timestamp,AIN0,AIN1"));
    assert!(text.lines().nth(1).unwrap().ends_with(",1.5000,-2.2500"));
}

#[test]
fn test_connection_released_once_after_drop() {
    let bench = Bench::new();
    let mut seq = bench.sequencer(bench.input(), SequencerSettings::default(), LogMode::Labeled);

    seq.run_timed(&timed(&[(10.0, 0.0)])).unwrap();
    assert!(!seq.session().is_open());
    drop(seq);

    assert_eq!(bench.port.close_count(), 1);
}
