//! Start-of-run acknowledgement
//!
//! The servo moves as soon as the run starts, so the operator has to type
//! `yes` first. Anything else leaves the hardware untouched.

use std::io::{self, BufRead, Write};

use servocal_core::config::RunMode;

fn instructions(mode: RunMode) -> &'static str {
    match mode {
        RunMode::TimedSequence | RunMode::CsvImport => {
            "The servo steps through the plan on its own. Press q or Esc to stop early."
        }
        RunMode::FixedListManual => {
            "The servo moves to each angle and waits. Press Enter for the next angle, q or Esc to stop."
        }
        RunMode::Interactive => {
            "Hold u/Up or d/Down to move the servo, release to return to neutral. Press q or Esc to stop."
        }
        RunMode::Monitor => "Sensors are sampled without moving the servo. Press q or Esc to stop.",
    }
}

/// Describe the run and wait for the operator to type `yes`
pub fn acknowledge<R: BufRead, W: Write>(input: &mut R, output: &mut W, mode: RunMode) -> io::Result<bool> {
    writeln!(output, "Mode: {}", mode)?;
    writeln!(output, "{}", instructions(mode))?;
    if mode != RunMode::Monitor {
        writeln!(output, "Make sure the servo is free to travel its full range.")?;
    }
    write!(output, "Type yes to start: ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}
