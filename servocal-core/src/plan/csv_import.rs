//! CSV plan import
//!
//! Each record is `token,duration`. The duration must be a non-negative
//! number or the whole record is dropped, as is a record with extra fields.
//! The token is an angle when numeric, otherwise `up`/`u` or `down`/`d` (any
//! case), and anything else falls back to the neutral preset. Lines starting
//! with `#` are comments.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use log::warn;
use servocal_hal::Direction;

use super::step::{CalibrationStep, Plan, StepTarget};
use crate::error::{ConfigError, ParseWarning};

/// Parsed plan plus the lines that were skipped
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPlan {
    pub plan: Plan,
    pub warnings: Vec<ParseWarning>,
}

fn parse_token(token: &str) -> StepTarget {
    if let Ok(angle) = token.parse::<f64>() {
        return StepTarget::Angle(angle);
    }
    let direction = match token.to_ascii_lowercase().as_str() {
        "up" | "u" => Direction::Up,
        "down" | "d" => Direction::Down,
        _ => Direction::Neutral,
    };
    StepTarget::Direction(direction)
}

fn parse_record(record: &StringRecord) -> Result<CalibrationStep, &'static str> {
    let token = record.get(0).unwrap_or_default();
    let duration = record.get(1).ok_or("missing duration")?;
    if record.len() > 2 {
        return Err("too many fields");
    }

    let duration_s: f64 = duration.parse().map_err(|_| "duration is not a number")?;
    if !duration_s.is_finite() || duration_s < 0.0 {
        return Err("duration must be a non-negative number");
    }

    Ok(CalibrationStep::new(parse_token(token), duration_s))
}

/// Whitespace-only lines and indented comments
fn is_filler(record: &StringRecord) -> bool {
    match record.get(0) {
        None => true,
        Some(first) => (record.len() == 1 && first.is_empty()) || first.starts_with('#'),
    }
}

fn skip(warnings: &mut Vec<ParseWarning>, line: usize, content: String, reason: &'static str) {
    warn!("Plan line {} skipped ({}): {}", line, reason, content);
    warnings.push(ParseWarning {
        line,
        content,
        reason,
    });
}

/// Parse plan text
pub fn parse_plan(text: &str) -> Result<ParsedPlan, ConfigError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(text.as_bytes());

    let mut steps = Vec::new();
    let mut warnings = Vec::new();

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                let line = err.position().map_or(0, |pos| pos.line() as usize);
                skip(&mut warnings, line, err.to_string(), "unreadable record");
                continue;
            }
        };
        if is_filler(&record) {
            continue;
        }

        let line = record.position().map_or(0, |pos| pos.line() as usize);
        match parse_record(&record) {
            Ok(step) => steps.push(step),
            Err(reason) => {
                let content = record.iter().collect::<Vec<_>>().join(",");
                skip(&mut warnings, line, content, reason);
            }
        }
    }

    Ok(ParsedPlan {
        plan: Plan::new(steps)?,
        warnings,
    })
}

/// Read and parse a plan file
pub fn load_plan(path: &Path) -> Result<ParsedPlan, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::PlanFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_plan(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_plan() {
        let parsed = parse_plan("up,1.5\ndown,2\nbogus,-1\n5,0.5").unwrap();
        let steps = parsed.plan.steps();

        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0], CalibrationStep::new(StepTarget::Direction(Direction::Up), 1.5));
        assert_eq!(steps[1], CalibrationStep::new(StepTarget::Direction(Direction::Down), 2.0));
        assert_eq!(steps[2], CalibrationStep::new(StepTarget::Angle(5.0), 0.5));
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].line, 3);
    }

    #[test]
    fn test_unknown_token_is_neutral() {
        let parsed = parse_plan("sideways,1").unwrap();
        assert_eq!(
            parsed.plan.steps()[0].target,
            StepTarget::Direction(Direction::Neutral)
        );
    }

    #[test]
    fn test_symbolic_tokens_ignore_case() {
        let parsed = parse_plan("U,1\nDown,1\nd,1").unwrap();
        let targets: Vec<_> = parsed.plan.steps().iter().map(|s| s.target).collect();
        assert_eq!(
            targets,
            vec![
                StepTarget::Direction(Direction::Up),
                StepTarget::Direction(Direction::Down),
                StepTarget::Direction(Direction::Down),
            ]
        );
    }

    #[test]
    fn test_blank_and_comment_lines_ignored() {
        let parsed = parse_plan("\n# angle,seconds\n  \n90, 2\n").unwrap();
        assert_eq!(parsed.plan.len(), 1);
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_bad_durations_dropped() {
        let parsed = parse_plan("90\n90,abc\n90,NaN\n90,inf\n90,1").unwrap();
        assert_eq!(parsed.plan.len(), 1);
        assert_eq!(parsed.warnings.len(), 4);
    }

    #[test]
    fn test_no_valid_lines_is_empty_plan() {
        assert_eq!(parse_plan("up,-1\n\n"), Err(ConfigError::EmptyPlan));
    }

    #[test]
    fn test_extra_fields_drop_the_line() {
        let parsed = parse_plan("90,1,junk\n45,2").unwrap();
        assert_eq!(parsed.plan.len(), 1);
        assert_eq!(parsed.plan.steps()[0].target, StepTarget::Angle(45.0));
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].line, 1);
        assert_eq!(parsed.warnings[0].content, "90,1,junk");
        assert_eq!(parsed.warnings[0].reason, "too many fields");
    }

    #[test]
    fn test_quoted_fields() {
        let parsed = parse_plan("\"up\",\"1.5\"\n\"45\" , 2").unwrap();
        let steps = parsed.plan.steps();
        assert_eq!(steps[0], CalibrationStep::new(StepTarget::Direction(Direction::Up), 1.5));
        assert_eq!(steps[1], CalibrationStep::new(StepTarget::Angle(45.0), 2.0));
    }

    #[test]
    fn test_indented_comments_and_whitespace_lines() {
        let parsed = parse_plan("  # angle,seconds\n   \n0,1\n180\n").unwrap();
        assert_eq!(parsed.plan.len(), 1);
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].content, "180");
        assert_eq!(parsed.warnings[0].reason, "missing duration");
    }

    #[test]
    fn test_missing_file() {
        let result = load_plan(Path::new("/nonexistent/plan.csv"));
        assert!(matches!(result, Err(ConfigError::PlanFile { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.csv");
        std::fs::write(&path, "0,1\n180,1\n").unwrap();

        let parsed = load_plan(&path).unwrap();
        assert_eq!(parsed.plan.len(), 2);
    }
}
