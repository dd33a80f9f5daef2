//! Per-wheel PID speed controller.
//!
//! Each wheel owns its motor driver and encoder and closes the loop in PWM
//! units: the error is the difference between the target PWM and the PWM
//! equivalent of the measured angular speed. The loop runs on the
//! microsecond timebase — Δt enters the integral and derivative in µs,
//! which is what the default gains are tuned against. The integral is
//! never clamped or decayed; under sustained saturation it will wind up.
//! Known limitation — the gearing keeps real errors small enough in
//! practice.
//!
//! Setting the maximum speed to zero is the emergency-stop primitive: the
//! driver is forced to STILL and any non-zero request is rejected until the
//! limit is raised again.

use kiwi_common::consts::{PWM_MAX, STEPS_TO_RADIANS, STILL};
use kiwi_hal::driver::{MotorDriver, MotorPins};
use kiwi_hal::encoder::Encoder;
use thiserror::Error;

/// Rejected wheel speed requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WheelError {
    /// Non-zero speed requested while the maximum speed is zero.
    #[error("wheel is halted: maximum speed is zero")]
    Halted,

    /// Normalised speed outside [-1, 1].
    #[error("normalised speed outside [-1, 1]")]
    OutOfRange,
}

/// PID gains of the wheel speed loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 1.4,
            ki: 0.5,
            kd: 0.8,
        }
    }
}

/// One driven wheel: driver + encoder + PID state.
pub struct Wheel<P: MotorPins, E: Encoder> {
    driver: MotorDriver<P>,
    encoder: E,
    gains: PidGains,
    /// Maximum angular speed [rad/s]; 0 = halted.
    max_speed: f64,
    /// Encoder count at the previous tick.
    last_count: i64,
    /// Timestamp of the previous tick [µs]; 0 = no tick yet.
    last_us: u64,
    /// Accumulated integral error [PWM·µs].
    cum_error: f64,
    /// Error at the previous tick [PWM].
    last_error: f64,
    /// Current target speed [PWM].
    target_pwm: i16,
}

impl<P: MotorPins, E: Encoder> Wheel<P, E> {
    /// Build a wheel around its peripherals, halted until a maximum speed
    /// is configured.
    pub fn new(pins: P, encoder: E) -> Self {
        Self {
            driver: MotorDriver::new(pins),
            encoder,
            gains: PidGains::default(),
            max_speed: 0.0,
            last_count: 0,
            last_us: 0,
            cum_error: 0.0,
            last_error: 0.0,
            target_pwm: STILL,
        }
    }

    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
    }

    #[inline]
    pub const fn gains(&self) -> PidGains {
        self.gains
    }

    /// Configure the maximum angular speed [rad/s].
    ///
    /// A non-positive value halts the wheel immediately: the driver is
    /// commanded STILL and the target is zeroed.
    pub fn set_max_speed(&mut self, max_speed: f64) {
        if max_speed <= 0.0 {
            self.max_speed = 0.0;
            self.target_pwm = STILL;
            self.driver.set_speed(STILL);
        } else {
            self.max_speed = max_speed;
        }
    }

    #[inline]
    pub const fn max_speed(&self) -> f64 {
        self.max_speed
    }

    /// Request an angular speed [rad/s].
    pub fn set_speed(&mut self, speed: f64) -> Result<(), WheelError> {
        if self.max_speed == 0.0 {
            if speed == 0.0 {
                return self.set_normalised_speed(0.0);
            }
            return Err(WheelError::Halted);
        }
        self.set_normalised_speed(speed / self.max_speed)
    }

    /// Request a speed as a fraction of the maximum, in [-1, 1].
    pub fn set_normalised_speed(&mut self, normalised: f64) -> Result<(), WheelError> {
        if !(-1.0..=1.0).contains(&normalised) {
            return Err(WheelError::OutOfRange);
        }
        if self.max_speed == 0.0 && normalised != 0.0 {
            return Err(WheelError::Halted);
        }
        self.target_pwm = pwm_from_fraction(normalised);
        Ok(())
    }

    /// Current target speed [PWM].
    #[inline]
    pub const fn target_pwm(&self) -> i16 {
        self.target_pwm
    }

    /// PWM last applied to the driver.
    #[inline]
    pub const fn applied_pwm(&self) -> i16 {
        self.driver.speed()
    }

    /// Run one control iteration at the given timestamp [µs].
    ///
    /// Reads the encoder, runs the PID against the measured angular speed
    /// and writes the resulting PWM (STILL while halted). Returns the wheel
    /// rotation since the previous call [rad].
    ///
    /// The first call only latches the encoder count and timestamp; no PWM
    /// is produced and the reported rotation is zero.
    pub fn handle(&mut self, now_us: u64) -> f64 {
        let now_us = now_us.max(1);
        let count = self.encoder.read();

        if self.last_us == 0 {
            self.last_us = now_us;
            self.last_count = count;
            return 0.0;
        }

        let delta_steps = count - self.last_count;
        let rotated = delta_steps as f64 * STEPS_TO_RADIANS;
        let dt_us = now_us.saturating_sub(self.last_us);

        if dt_us > 0 {
            let dt = dt_us as f64;
            let measured = rotated * 1_000_000.0 / dt; // rad/s
            let error = self.target_pwm as f64 - self.angular_to_pwm(measured);

            self.cum_error += error * dt;
            let derivative = (error - self.last_error) / dt;
            self.last_error = error;

            let output =
                self.gains.kp * error + self.gains.ki * self.cum_error + self.gains.kd * derivative;
            let pwm = (output.round() as i64).clamp(-(PWM_MAX as i64), PWM_MAX as i64) as i16;

            self.driver
                .set_speed(if self.max_speed == 0.0 { STILL } else { pwm });
        }

        self.last_us = now_us;
        self.last_count = count;
        rotated
    }

    /// PWM equivalent of an angular speed, rounded half away from zero.
    ///
    /// With a zero maximum the mapping degenerates: zero stays zero, any
    /// other speed saturates by sign.
    fn angular_to_pwm(&self, speed: f64) -> f64 {
        if self.max_speed == 0.0 {
            if speed == 0.0 {
                0.0
            } else {
                (PWM_MAX as f64).copysign(speed)
            }
        } else {
            (speed * PWM_MAX as f64 / self.max_speed).round()
        }
    }
}

/// Convert a [-1, 1] fraction into a clamped signed PWM value.
#[inline]
fn pwm_from_fraction(fraction: f64) -> i16 {
    let pwm = (fraction * PWM_MAX as f64).round();
    (pwm as i64).clamp(-(PWM_MAX as i64), PWM_MAX as i64) as i16
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use kiwi_hal::driver::Direction;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Pin set recording the applied signed PWM.
    #[derive(Clone, Default)]
    struct FakePins {
        direction: Rc<Cell<i8>>,
        magnitude: Rc<Cell<u8>>,
    }

    impl FakePins {
        fn signed_pwm(&self) -> i16 {
            self.direction.get() as i16 * self.magnitude.get() as i16
        }
    }

    impl MotorPins for FakePins {
        fn set_direction(&mut self, direction: Direction) {
            self.direction.set(match direction {
                Direction::Forwards => 1,
                Direction::Backwards => -1,
                Direction::Released | Direction::Braked => 0,
            });
        }

        fn set_magnitude(&mut self, magnitude: u8) {
            self.magnitude.set(magnitude);
        }
    }

    /// Encoder fed by the test.
    #[derive(Clone, Default)]
    struct FakeEncoder {
        count: Rc<RefCell<i64>>,
    }

    impl FakeEncoder {
        fn advance(&self, steps: i64) {
            *self.count.borrow_mut() += steps;
        }
    }

    impl Encoder for FakeEncoder {
        fn read(&mut self) -> i64 {
            *self.count.borrow()
        }
    }

    fn wheel() -> (Wheel<FakePins, FakeEncoder>, FakePins, FakeEncoder) {
        let pins = FakePins::default();
        let encoder = FakeEncoder::default();
        let mut wheel = Wheel::new(pins.clone(), encoder.clone());
        wheel.set_max_speed(10.0);
        (wheel, pins, encoder)
    }

    #[test]
    fn default_gains() {
        let (wheel, _, _) = wheel();
        let g = wheel.gains();
        assert_eq!((g.kp, g.ki, g.kd), (1.4, 0.5, 0.8));
    }

    #[test]
    fn normalised_speed_maps_to_pwm() {
        let (mut wheel, _, _) = wheel();
        wheel.set_normalised_speed(1.0).unwrap();
        assert_eq!(wheel.target_pwm(), 255);
        wheel.set_normalised_speed(-0.5).unwrap();
        assert_eq!(wheel.target_pwm(), -128); // -127.5 rounds away from zero
        wheel.set_normalised_speed(0.0).unwrap();
        assert_eq!(wheel.target_pwm(), 0);
    }

    #[test]
    fn out_of_range_rejected() {
        let (mut wheel, _, _) = wheel();
        assert_eq!(wheel.set_normalised_speed(1.1), Err(WheelError::OutOfRange));
        assert_eq!(
            wheel.set_normalised_speed(-1.01),
            Err(WheelError::OutOfRange)
        );
        // Both bounds are inclusive.
        assert!(wheel.set_normalised_speed(1.0).is_ok());
        assert!(wheel.set_normalised_speed(-1.0).is_ok());
    }

    #[test]
    fn angular_speed_scales_by_max() {
        let (mut wheel, _, _) = wheel();
        wheel.set_speed(5.0).unwrap();
        assert_eq!(wheel.target_pwm(), 128); // 5/10 → 127.5 → 128
        assert!(wheel.set_speed(10.1).is_err()); // above max
    }

    #[test]
    fn halted_wheel_rejects_motion() {
        let (mut wheel, pins, _) = wheel();
        wheel.set_max_speed(0.0);
        assert_eq!(wheel.set_speed(1.0), Err(WheelError::Halted));
        assert_eq!(wheel.set_normalised_speed(0.3), Err(WheelError::Halted));
        // Zero requests still succeed.
        assert!(wheel.set_speed(0.0).is_ok());
        assert!(wheel.set_normalised_speed(0.0).is_ok());
        assert_eq!(pins.signed_pwm(), 0);
    }

    #[test]
    fn halting_forces_still_output() {
        let (mut wheel, pins, encoder) = wheel();
        wheel.set_normalised_speed(1.0).unwrap();
        wheel.handle(1);
        encoder.advance(10);
        wheel.handle(10_001);
        assert!(pins.signed_pwm() > 0);

        wheel.set_max_speed(0.0);
        assert_eq!(wheel.target_pwm(), STILL);
        assert_eq!(pins.signed_pwm(), 0);

        // Subsequent ticks keep the driver still.
        encoder.advance(10);
        wheel.handle(20_001);
        assert_eq!(pins.signed_pwm(), 0);
    }

    #[test]
    fn first_handle_only_latches_state() {
        let (mut wheel, pins, encoder) = wheel();
        encoder.advance(500);
        let rotated = wheel.handle(1_000);
        assert_eq!(rotated, 0.0);
        assert_eq!(pins.signed_pwm(), 0);
    }

    #[test]
    fn handle_reports_rotation() {
        let (mut wheel, _, encoder) = wheel();
        wheel.handle(1);
        encoder.advance(1920); // one full wheel revolution
        let rotated = wheel.handle(1_000_001);
        assert!((rotated - core::f64::consts::TAU).abs() < 1e-12);

        encoder.advance(-960); // half revolution backwards
        let rotated = wheel.handle(2_000_001);
        assert!((rotated + core::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn pid_drives_toward_target() {
        let (mut wheel, pins, encoder) = wheel();
        wheel.set_normalised_speed(0.5).unwrap();
        wheel.handle(1);
        // Stationary wheel, positive target → positive PWM.
        wheel.handle(10_001);
        let first = pins.signed_pwm();
        assert!(first > 0);

        // Error persists → integral grows → output does not shrink.
        wheel.handle(20_001);
        assert!(pins.signed_pwm() >= first);

        // Wheel spinning exactly at target → P term vanishes.
        let mut tracking = {
            let pins = FakePins::default();
            let encoder = FakeEncoder::default();
            let mut w = Wheel::new(pins.clone(), encoder.clone());
            w.set_max_speed(10.0);
            (w, pins, encoder)
        };
        tracking.0.set_normalised_speed(0.5).unwrap();
        tracking.0.handle(1);
        // 5 rad/s for 10 ms → 0.05 rad → steps.
        let steps = (0.05 / STEPS_TO_RADIANS).round() as i64;
        tracking.2.advance(steps);
        tracking.0.handle(10_001);
        // Target is 128 PWM, measured quantises to ≈125 → error stays
        // within a few PWM counts.
        assert!(tracking.0.last_error.abs() <= 4.0);
    }

    #[test]
    fn zero_dt_skips_pid() {
        let (mut wheel, pins, encoder) = wheel();
        wheel.set_normalised_speed(1.0).unwrap();
        wheel.handle(5_000);
        encoder.advance(100);
        // Same timestamp again — no dt, no PID step, but rotation reported.
        let rotated = wheel.handle(5_000);
        assert!(rotated > 0.0);
        assert_eq!(pins.signed_pwm(), 0);
    }

    #[test]
    fn timestamp_zero_is_substituted() {
        let (mut wheel, _, _) = wheel();
        wheel.handle(0);
        assert_eq!(wheel.last_us, 1);
    }
}
