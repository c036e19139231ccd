//! PWM timing math
//!
//! Pure functions mapping a commanded angle to clock and compare values.
//! With the default configuration (80 MHz, divisor 1, 50 Hz, 1-2 ms pulse)
//! the roll value is 1 600 000 and the duty cycle is `5 + angle / 36` percent.

use crate::config::PwmConfig;
use crate::error::ConfigError;

/// Derived clock parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockParams {
    /// Counter tick rate after the divisor (Hz)
    pub tick_rate_hz: u64,
    /// Counter value at which one PWM period rolls over
    pub roll_value: u32,
}

impl ClockParams {
    /// Compare value producing `duty_percent` of the period
    pub fn compare_value(&self, duty_percent: f64) -> u32 {
        let compare = (f64::from(self.roll_value) * duty_percent / 100.0).round();
        compare.clamp(0.0, f64::from(self.roll_value)) as u32
    }
}

/// Derive the clock divisor tick rate and roll value
pub fn compute_clock_params(config: &PwmConfig) -> Result<ClockParams, ConfigError> {
    if config.clock_divisor == 0 {
        return Err(ConfigError::InvalidTiming("clock divisor is zero".into()));
    }
    if config.desired_frequency_hz == 0 {
        return Err(ConfigError::InvalidTiming("frequency is zero".into()));
    }

    let tick_rate_hz = config.core_clock_hz / u64::from(config.clock_divisor);
    let roll = tick_rate_hz / u64::from(config.desired_frequency_hz);

    if roll == 0 {
        return Err(ConfigError::InvalidTiming(format!(
            "{} Hz is faster than the {} Hz tick rate",
            config.desired_frequency_hz, tick_rate_hz
        )));
    }
    let roll_value = u32::try_from(roll).map_err(|_| {
        ConfigError::InvalidTiming(format!("roll value {} does not fit 32 bits", roll))
    })?;

    Ok(ClockParams {
        tick_rate_hz,
        roll_value,
    })
}

/// Reject angles outside `0..=max_angle_deg`
pub fn check_angle(config: &PwmConfig, angle: f64) -> Result<(), ConfigError> {
    if angle.is_finite() && (0.0..=config.max_angle_deg).contains(&angle) {
        Ok(())
    } else {
        Err(ConfigError::InvalidAngle {
            angle,
            max: config.max_angle_deg,
        })
    }
}

/// Check that the pulse range fits inside one PWM period
pub fn validate_pulse_width(config: &PwmConfig) -> Result<(), ConfigError> {
    let period_ms = config.period_ms();
    let ok = config.pulse_min_ms.is_finite()
        && config.pulse_max_ms.is_finite()
        && config.pulse_min_ms >= 0.0
        && config.pulse_min_ms < config.pulse_max_ms
        && config.pulse_max_ms <= period_ms
        && config.max_angle_deg.is_finite()
        && config.max_angle_deg > 0.0;

    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidPulseWidth {
            min_ms: config.pulse_min_ms,
            max_ms: config.pulse_max_ms,
            period_ms,
        })
    }
}

/// Duty cycle (percent) for an angle
///
/// Pulse widths are fixed in milliseconds, so changing the frequency changes
/// the duty cycle but not the pulse.
pub fn compute_duty_cycle(config: &PwmConfig, angle: f64) -> f64 {
    let span = config.pulse_max_ms - config.pulse_min_ms;
    let pulse_ms = config.pulse_min_ms + angle / config.max_angle_deg * span;
    pulse_ms / config.period_ms() * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_clock_params() {
        let params = compute_clock_params(&PwmConfig::default()).unwrap();
        assert_eq!(params.tick_rate_hz, 80_000_000);
        assert_eq!(params.roll_value, 1_600_000);
    }

    #[test]
    fn test_default_duty_cycle() {
        let config = PwmConfig::default();
        assert!((compute_duty_cycle(&config, 0.0) - 5.0).abs() < 1e-9);
        assert!((compute_duty_cycle(&config, 90.0) - 7.5).abs() < 1e-9);
        assert!((compute_duty_cycle(&config, 180.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_compare_value_rounds() {
        let params = ClockParams {
            tick_rate_hz: 1000,
            roll_value: 3,
        };
        // 3 * 50% = 1.5 rounds away from zero
        assert_eq!(params.compare_value(50.0), 2);
        assert_eq!(params.compare_value(0.0), 0);
        assert_eq!(params.compare_value(100.0), 3);
    }

    #[test]
    fn test_default_compare_values() {
        let config = PwmConfig::default();
        let params = compute_clock_params(&config).unwrap();
        assert_eq!(params.compare_value(compute_duty_cycle(&config, 0.0)), 80_000);
        assert_eq!(params.compare_value(compute_duty_cycle(&config, 90.0)), 120_000);
        assert_eq!(params.compare_value(compute_duty_cycle(&config, 180.0)), 160_000);
    }

    #[test]
    fn test_zero_divisor_rejected() {
        let config = PwmConfig {
            clock_divisor: 0,
            ..PwmConfig::default()
        };
        assert!(matches!(
            compute_clock_params(&config),
            Err(ConfigError::InvalidTiming(_))
        ));
    }

    #[test]
    fn test_zero_frequency_rejected() {
        let config = PwmConfig {
            desired_frequency_hz: 0,
            ..PwmConfig::default()
        };
        assert!(compute_clock_params(&config).is_err());
    }

    #[test]
    fn test_zero_roll_rejected() {
        let config = PwmConfig {
            core_clock_hz: 10,
            desired_frequency_hz: 50,
            ..PwmConfig::default()
        };
        assert!(compute_clock_params(&config).is_err());
    }

    #[test]
    fn test_oversized_roll_rejected() {
        let config = PwmConfig {
            core_clock_hz: u64::MAX,
            desired_frequency_hz: 1,
            ..PwmConfig::default()
        };
        assert!(compute_clock_params(&config).is_err());
    }

    #[test]
    fn test_angle_bounds() {
        let config = PwmConfig::default();
        assert!(check_angle(&config, 0.0).is_ok());
        assert!(check_angle(&config, 180.0).is_ok());
        assert!(check_angle(&config, -0.1).is_err());
        assert!(check_angle(&config, 180.1).is_err());
        assert!(check_angle(&config, f64::NAN).is_err());
    }

    #[test]
    fn test_pulse_width_must_fit_period() {
        let config = PwmConfig {
            desired_frequency_hz: 1000,
            ..PwmConfig::default()
        };
        assert!(matches!(
            validate_pulse_width(&config),
            Err(ConfigError::InvalidPulseWidth { .. })
        ));
        assert!(validate_pulse_width(&PwmConfig::default()).is_ok());
    }

    proptest! {
        #[test]
        fn prop_duty_cycle_monotonic(a in 0.0f64..=180.0, b in 0.0f64..=180.0) {
            let config = PwmConfig::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(compute_duty_cycle(&config, lo) <= compute_duty_cycle(&config, hi));
        }

        #[test]
        fn prop_duty_cycle_matches_default_formula(angle in 0.0f64..=180.0) {
            let config = PwmConfig::default();
            prop_assert!((compute_duty_cycle(&config, angle) - (5.0 + angle / 36.0)).abs() < 1e-9);
        }

        #[test]
        fn prop_valid_params_have_positive_roll(
            core in 1u64..=1_000_000_000,
            divisor in 1u32..=256,
            freq in 1u32..=100_000,
        ) {
            let config = PwmConfig {
                core_clock_hz: core,
                clock_divisor: divisor,
                desired_frequency_hz: freq,
                ..PwmConfig::default()
            };
            if let Ok(params) = compute_clock_params(&config) {
                prop_assert!(params.roll_value >= 1);
                prop_assert_eq!(u64::from(params.roll_value), core / u64::from(divisor) / u64::from(freq));
            }
        }
    }
}
