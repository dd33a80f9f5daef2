//! Simulation backend.
//!
//! A first-order DC motor model exposed through the same pin/encoder
//! contracts production firmware implements, plus a manually advanced
//! clock. One [`SimMotor`] owns the physics; the pin and encoder handles
//! share its state so that a `Wheel` can own them independently, the way
//! it owns real peripherals.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use kiwi_common::consts::{PWM_MAX, STEPS_TO_RADIANS};
use tracing::trace;

use crate::clock::Clock;
use crate::driver::{Direction, MotorPins};
use crate::encoder::Encoder;

/// Motor model parameters.
#[derive(Debug, Clone, Copy)]
pub struct SimMotorConfig {
    /// Steady-state angular speed at full PWM [rad/s].
    pub max_speed: f64,
    /// First-order time constant while driven [s].
    pub time_constant: f64,
    /// Time constant while coasting (RELEASED) [s].
    pub coast_time_constant: f64,
    /// Time constant while braking (BRAKED) [s].
    pub brake_time_constant: f64,
}

impl Default for SimMotorConfig {
    fn default() -> Self {
        Self {
            max_speed: 10.0,
            time_constant: 0.05,
            coast_time_constant: 0.5,
            brake_time_constant: 0.01,
        }
    }
}

#[derive(Debug)]
struct MotorState {
    direction: Direction,
    magnitude: u8,
    /// Signed angular speed [rad/s].
    speed: f64,
    /// Accumulated shaft angle [rad].
    angle: f64,
}

/// First-order motor + encoder physics.
pub struct SimMotor {
    config: SimMotorConfig,
    state: Rc<RefCell<MotorState>>,
}

impl SimMotor {
    pub fn new(config: SimMotorConfig) -> Self {
        Self {
            config,
            state: Rc::new(RefCell::new(MotorState {
                direction: Direction::Released,
                magnitude: 0,
                speed: 0.0,
                angle: 0.0,
            })),
        }
    }

    /// Pin handle for the driver side.
    pub fn pins(&self) -> SimMotorPins {
        SimMotorPins {
            state: Rc::clone(&self.state),
        }
    }

    /// Encoder handle for the feedback side.
    pub fn encoder(&self) -> SimEncoder {
        SimEncoder {
            state: Rc::clone(&self.state),
        }
    }

    /// Advance the physics by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        let mut state = self.state.borrow_mut();

        let (target, tau) = match state.direction {
            Direction::Released => (0.0, self.config.coast_time_constant),
            Direction::Braked => (0.0, self.config.brake_time_constant),
            Direction::Forwards => (
                self.config.max_speed * state.magnitude as f64 / PWM_MAX as f64,
                self.config.time_constant,
            ),
            Direction::Backwards => (
                -self.config.max_speed * state.magnitude as f64 / PWM_MAX as f64,
                self.config.time_constant,
            ),
        };

        let alpha = if tau <= 0.0 { 1.0 } else { (dt / tau).min(1.0) };
        state.speed += (target - state.speed) * alpha;
        state.angle += state.speed * dt;

        trace!(
            target_speed = target,
            speed = state.speed,
            angle = state.angle,
            "sim motor step"
        );
    }

    /// Current angular speed [rad/s].
    pub fn speed(&self) -> f64 {
        self.state.borrow().speed
    }
}

/// [`MotorPins`] handle writing into the shared motor state.
pub struct SimMotorPins {
    state: Rc<RefCell<MotorState>>,
}

impl MotorPins for SimMotorPins {
    fn set_direction(&mut self, direction: Direction) {
        self.state.borrow_mut().direction = direction;
    }

    fn set_magnitude(&mut self, magnitude: u8) {
        self.state.borrow_mut().magnitude = magnitude;
    }
}

/// [`Encoder`] handle reading the shared motor state.
pub struct SimEncoder {
    state: Rc<RefCell<MotorState>>,
}

impl Encoder for SimEncoder {
    fn read(&mut self) -> i64 {
        (self.state.borrow().angle / STEPS_TO_RADIANS).round() as i64
    }
}

// ─── Manual clock ───────────────────────────────────────────────────

/// Manually advanced clock for deterministic tests.
///
/// Cloned handles share the same time value.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start at the given microsecond reading.
    pub fn starting_at_us(micros: u64) -> Self {
        let clock = Self::new();
        clock.micros.set(micros);
        clock
    }

    pub fn advance_us(&self, us: u64) {
        self.micros.set(self.micros.get() + us);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance_us(ms * 1000);
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> u64 {
        self.micros.get()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
