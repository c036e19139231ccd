//! servocal command-line tool
//!
//! Loads the bench configuration, asks the operator to confirm, and runs one
//! calibration against the simulated register device.

#![deny(unsafe_code)]

mod config;
mod plotter;
mod prompt;
mod run;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgAction, Parser};
use env_logger::Env;
use log::{error, info};
use servocal_core::config::RunMode;
use servocal_core::{Error, IoError};
use servocal_drivers::{SimulatedDevice, TerminalInput};

use crate::config::{load_config, Overrides};

/// Default configuration compiled into the binary
const EMBEDDED_CONFIG: &str = include_str!("../calibration.toml");

/// Servo and sensor calibration bench
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML); the built-in default is used when omitted
    config: Option<PathBuf>,

    /// Run mode: timed, interactive, csv, manual or monitor
    #[arg(short, long)]
    mode: Option<RunMode>,

    /// CSV plan file (implies csv mode unless --mode is given)
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Directory receiving the sample log
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Sampling tick in milliseconds
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Wait for the operator after every step
    #[arg(long)]
    confirm_steps: bool,

    /// Start without asking for confirmation
    #[arg(short = 'y', long)]
    yes: bool,

    /// Viewer command started with the log path as its last argument
    #[arg(long)]
    plot: Option<String>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    // Raw terminal mode does not return the carriage on '\n'
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format(|buf, record| {
            write!(
                buf,
                "[{} {}] {}\r\n",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = match load_config(args.config.as_deref(), EMBEDDED_CONFIG) {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            return ExitCode::from(run::EXIT_CONFIG);
        }
    };
    Overrides {
        mode: args.mode,
        plan_file: args.plan,
        output_dir: args.output_dir,
        poll_interval_ms: args.poll_ms,
        confirm_between_steps: args.confirm_steps,
    }
    .apply(&mut config);
    let mode = config.run.mode;

    let plan = match run::prepare(&config) {
        Ok(plan) => plan,
        Err(err) => {
            error!("{}", err);
            return ExitCode::from(run::EXIT_CONFIG);
        }
    };

    if !args.yes {
        let stdin = std::io::stdin();
        match prompt::acknowledge(&mut stdin.lock(), &mut std::io::stdout(), mode) {
            Ok(true) => {}
            Ok(false) => {
                info!("Not confirmed, nothing was started");
                return ExitCode::from(run::EXIT_ABORTED);
            }
            Err(err) => {
                error!("Could not read confirmation: {}", err);
                return ExitCode::from(run::EXIT_FAILURE);
            }
        }
    }

    let result = TerminalInput::new()
        .map(|input| match config.run.hold_window_ms {
            Some(ms) => input.with_hold_window(Duration::from_millis(ms)),
            None => input,
        })
        .map_err(|err| Error::from(IoError::Input(err)))
        .and_then(|input| {
            run::execute::<SimulatedDevice, _>(&config, plan, input, args.plot.as_deref())
        });

    match &result {
        Ok(report) => info!(
            "Run {:?}: {} step(s), {} sample(s) in {}",
            report.outcome,
            report.steps_completed,
            report.samples_written,
            report.log_path.display()
        ),
        Err(err) => error!("{}", err),
    }
    ExitCode::from(run::exit_code(&result, mode))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "servocal",
            "bench.toml",
            "--mode",
            "interactive",
            "-o",
            "logs",
            "-vv",
            "--yes",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("bench.toml")));
        assert_eq!(args.mode, Some(RunMode::Interactive));
        assert_eq!(args.output_dir, Some(PathBuf::from("logs")));
        assert_eq!(args.verbose, 2);
        assert!(args.yes);
        assert!(args.plan.is_none());
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Args::try_parse_from(["servocal", "--mode", "sideways"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
