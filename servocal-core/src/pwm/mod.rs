//! PWM signal generation
//!
//! - [`timing`]: pure angle to duty cycle and clock parameter math
//! - [`controller`]: batched register programming of the PWM output

pub mod controller;
pub mod timing;

pub use controller::{PwmController, PwmState, CLOCK0_ENABLE};
pub use timing::{
    check_angle, compute_clock_params, compute_duty_cycle, validate_pulse_width, ClockParams,
};
