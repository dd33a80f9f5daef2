//! Motor driver contract and the two supported H-bridge wirings.
//!
//! A driver is addressed through [`MotorPins`], a two-operation contract
//! (direction + magnitude). [`MotorDriver`] layers the signed-PWM policy on
//! top: clamping, direction derivation from sign, and the cached applied
//! speed. Pin I/O is assumed to never fail.

use kiwi_common::consts::{PWM_MAX, STILL};

/// Drive direction of an H-bridge output stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Both half-bridges open — the motor coasts.
    Released,
    /// Positive rotation.
    Forwards,
    /// Negative rotation.
    Backwards,
    /// Both half-bridges shorted — active braking.
    Braked,
}

/// Raw PWM output channel, duty in [0, 255].
pub trait PwmOutput {
    fn set_duty(&mut self, duty: u8);
}

/// Raw digital output pin.
pub trait DigitalOutput {
    fn write(&mut self, high: bool);
}

/// The motor driver capability set.
///
/// Implementations must configure every pin as an output at construction
/// and leave the motor released with zero magnitude.
pub trait MotorPins {
    /// Select the bridge direction.
    fn set_direction(&mut self, direction: Direction);

    /// Apply the unsigned duty magnitude, in [0, [`PWM_MAX`]].
    fn set_magnitude(&mut self, magnitude: u8);
}

// ─── Signed-PWM policy ──────────────────────────────────────────────

/// Signed-PWM front end over a [`MotorPins`] realisation.
#[derive(Debug)]
pub struct MotorDriver<P: MotorPins> {
    pins: P,
    speed: i16,
}

impl<P: MotorPins> MotorDriver<P> {
    /// Wrap a pin set, leaving the motor stopped.
    pub fn new(pins: P) -> Self {
        let mut driver = Self { pins, speed: STILL };
        driver.set_speed(STILL);
        driver
    }

    /// Apply a signed PWM command.
    ///
    /// The argument is clamped to [-[`PWM_MAX`], +[`PWM_MAX`]] and cached.
    /// Direction follows the sign: zero releases the motor, positive drives
    /// forwards, negative backwards. Braking is never produced here — see
    /// [`MotorDriver::brake`].
    pub fn set_speed(&mut self, pwm: i16) {
        let pwm = pwm.clamp(-PWM_MAX, PWM_MAX);
        self.speed = pwm;

        let direction = match pwm {
            0 => Direction::Released,
            p if p > 0 => Direction::Forwards,
            _ => Direction::Backwards,
        };
        self.pins.set_direction(direction);
        self.pins.set_magnitude(pwm.unsigned_abs() as u8);
    }

    /// Actively brake with the given magnitude.
    pub fn brake(&mut self, magnitude: u8) {
        self.speed = STILL;
        self.pins.set_direction(Direction::Braked);
        self.pins.set_magnitude(magnitude);
    }

    /// Last applied signed PWM command.
    #[inline]
    pub const fn speed(&self) -> i16 {
        self.speed
    }
}

// ─── Dual-PWM H-bridge ──────────────────────────────────────────────

/// H-bridge driven by two PWM channels A and B.
///
/// FORWARDS puts the magnitude on A and 0 on B, BACKWARDS the reverse,
/// RELEASED zeroes both, BRAKED puts the magnitude on both.
#[derive(Debug)]
pub struct DualPwmPins<A: PwmOutput, B: PwmOutput> {
    a: A,
    b: B,
    direction: Direction,
    magnitude: u8,
}

impl<A: PwmOutput, B: PwmOutput> DualPwmPins<A, B> {
    pub fn new(mut a: A, mut b: B) -> Self {
        a.set_duty(0);
        b.set_duty(0);
        Self {
            a,
            b,
            direction: Direction::Released,
            magnitude: 0,
        }
    }

    fn apply(&mut self) {
        let m = self.magnitude;
        let (duty_a, duty_b) = match self.direction {
            Direction::Released => (0, 0),
            Direction::Forwards => (m, 0),
            Direction::Backwards => (0, m),
            Direction::Braked => (m, m),
        };
        self.a.set_duty(duty_a);
        self.b.set_duty(duty_b);
    }
}

impl<A: PwmOutput, B: PwmOutput> MotorPins for DualPwmPins<A, B> {
    fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
        self.apply();
    }

    fn set_magnitude(&mut self, magnitude: u8) {
        self.magnitude = magnitude;
        self.apply();
    }
}

// ─── PWM + two-digital direction ────────────────────────────────────

/// Driver with one PWM channel and two digital direction pins.
///
/// The PWM channel always carries the magnitude; (A, B) encode the
/// direction as (0,0) RELEASED, (1,0) FORWARDS, (0,1) BACKWARDS,
/// (1,1) BRAKED.
#[derive(Debug)]
pub struct PwmDirPins<P: PwmOutput, A: DigitalOutput, B: DigitalOutput> {
    pwm: P,
    a: A,
    b: B,
}

impl<P: PwmOutput, A: DigitalOutput, B: DigitalOutput> PwmDirPins<P, A, B> {
    pub fn new(mut pwm: P, mut a: A, mut b: B) -> Self {
        pwm.set_duty(0);
        a.write(false);
        b.write(false);
        Self { pwm, a, b }
    }
}

impl<P: PwmOutput, A: DigitalOutput, B: DigitalOutput> MotorPins for PwmDirPins<P, A, B> {
    fn set_direction(&mut self, direction: Direction) {
        let (a, b) = match direction {
            Direction::Released => (false, false),
            Direction::Forwards => (true, false),
            Direction::Backwards => (false, true),
            Direction::Braked => (true, true),
        };
        self.a.write(a);
        self.b.write(b);
    }

    fn set_magnitude(&mut self, magnitude: u8) {
        self.pwm.set_duty(magnitude);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
