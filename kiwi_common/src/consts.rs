//! Workspace-wide constants: PWM range, encoder resolution, scheduler
//! capacities and completion tolerances.

use core::f64::consts::TAU;

/// Maximum absolute PWM command accepted by a motor driver.
pub const PWM_MAX: i16 = 255;

/// PWM command that leaves the motor unpowered.
pub const STILL: i16 = 0;

/// Encoder resolution [steps per motor shaft revolution].
pub const ENCODER_STEPS_PER_REV: u32 = 64;

/// Gearbox reduction between motor shaft and wheel.
pub const GEAR_RATIO: u32 = 30;

/// Wheel rotation per encoder step [rad].
pub const STEPS_TO_RADIANS: f64 = TAU / ((ENCODER_STEPS_PER_REV * GEAR_RATIO) as f64);

/// Maximum number of finite movements held by the scheduler.
pub const MAX_MOVEMENTS: usize = 10;

/// Maximum number of f64 arguments carried by a wire command.
pub const MAX_ARGS: usize = 7;

/// Completion tolerance on the FORWARD and STRAFE axes [m].
pub const LINEAR_TOLERANCE: f64 = 0.01;

/// Completion tolerance on the THETA axis [rad] (≈1°).
pub const ANGULAR_TOLERANCE: f64 = 0.017_453_3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_to_radians_matches_gearing() {
        // 64 steps/rev through a 30:1 gearbox → 1920 steps per wheel turn.
        assert!((STEPS_TO_RADIANS - TAU / 1920.0).abs() < 1e-15);
    }
}
