//! Calibration plan model

use core::time::Duration;

use servocal_hal::Direction;

use crate::config::{AnglePresets, PwmConfig};
use crate::error::ConfigError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Angles visited by a fixed-list manual run
pub const DEFAULT_MANUAL_ANGLES: [f64; 5] = [0.0, 90.0, 180.0, 90.0, 0.0];

/// What a step commands
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum StepTarget {
    /// Explicit angle in degrees
    Angle(f64),
    /// A preset, resolved when the step runs
    Direction(Direction),
}

impl StepTarget {
    /// Concrete angle for this target
    pub fn resolve(&self, presets: &AnglePresets) -> f64 {
        match self {
            StepTarget::Angle(angle) => *angle,
            StepTarget::Direction(direction) => presets.resolve(*direction),
        }
    }
}

/// One plan step
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationStep {
    pub target: StepTarget,
    /// Hold time in seconds
    pub duration_s: f64,
}

impl CalibrationStep {
    pub fn new(target: StepTarget, duration_s: f64) -> Self {
        Self { target, duration_s }
    }

    /// Hold time, if the duration is a valid non-negative number
    pub fn duration(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.duration_s).ok()
    }
}

/// Ordered, validated list of steps
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    steps: Vec<CalibrationStep>,
}

impl Plan {
    /// Build a plan, rejecting empty plans and invalid durations
    pub fn new(steps: Vec<CalibrationStep>) -> Result<Self, ConfigError> {
        if steps.is_empty() {
            return Err(ConfigError::EmptyPlan);
        }
        if let Some((step, bad)) = steps
            .iter()
            .enumerate()
            .find(|(_, s)| s.duration().is_none())
        {
            return Err(ConfigError::InvalidDuration {
                step,
                duration_s: bad.duration_s,
            });
        }
        Ok(Self { steps })
    }

    /// Steps held until the operator confirms, one per angle
    pub fn manual_list(angles: &[f64]) -> Result<Self, ConfigError> {
        Self::new(
            angles
                .iter()
                .map(|angle| CalibrationStep::new(StepTarget::Angle(*angle), 0.0))
                .collect(),
        )
    }

    pub fn steps(&self) -> &[CalibrationStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Check every resolved step angle against the actuator's travel
    pub fn check_angles(&self, pwm: &PwmConfig, presets: &AnglePresets) -> Result<(), ConfigError> {
        self.steps
            .iter()
            .try_for_each(|step| crate::pwm::check_angle(pwm, step.target.resolve(presets)))
    }

    /// Total hold time of all steps
    pub fn total_duration(&self) -> Duration {
        self.steps.iter().filter_map(CalibrationStep::duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_angles_resolves_presets() {
        let pwm = PwmConfig::default();
        let plan = Plan::new(vec![
            CalibrationStep::new(StepTarget::Angle(0.0), 1.0),
            CalibrationStep::new(StepTarget::Direction(Direction::Up), 1.0),
        ])
        .unwrap();
        assert!(plan.check_angles(&pwm, &AnglePresets::default()).is_ok());

        let presets = AnglePresets {
            up: 200.0,
            ..AnglePresets::default()
        };
        assert_eq!(
            plan.check_angles(&pwm, &presets),
            Err(ConfigError::InvalidAngle {
                angle: 200.0,
                max: 180.0
            })
        );
    }

    #[test]
    fn test_empty_plan_rejected() {
        assert_eq!(Plan::new(Vec::new()), Err(ConfigError::EmptyPlan));
    }

    #[test]
    fn test_negative_duration_rejected() {
        let steps = vec![
            CalibrationStep::new(StepTarget::Angle(0.0), 1.0),
            CalibrationStep::new(StepTarget::Angle(90.0), -1.0),
        ];
        assert_eq!(
            Plan::new(steps),
            Err(ConfigError::InvalidDuration {
                step: 1,
                duration_s: -1.0
            })
        );
    }

    #[test]
    fn test_target_resolution() {
        let presets = AnglePresets::default();
        assert_eq!(StepTarget::Angle(42.0).resolve(&presets), 42.0);
        assert_eq!(StepTarget::Direction(Direction::Up).resolve(&presets), 180.0);
    }

    #[test]
    fn test_manual_list_order() {
        let plan = Plan::manual_list(&DEFAULT_MANUAL_ANGLES).unwrap();
        let angles: Vec<f64> = plan
            .steps()
            .iter()
            .map(|s| s.target.resolve(&AnglePresets::default()))
            .collect();
        assert_eq!(angles, DEFAULT_MANUAL_ANGLES);
        assert_eq!(plan.total_duration(), Duration::ZERO);
    }
}
