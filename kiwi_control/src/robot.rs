//! Top-level robot coordinator.
//!
//! Owns the three wheels, the kinematic transform, the pose estimate and
//! the movement scheduler, and glues them into one tick:
//!
//! 1. read wheel rotations (each wheel runs its PID),
//! 2. forward kinematics → body displacement → odometry,
//! 3. ask the scheduler for this tick's target velocity,
//! 4. inverse kinematics → per-wheel speed requests.
//!
//! The tick itself never fails: any rejected wheel request latches the
//! emergency stop, which zeroes every wheel's maximum speed and refuses
//! all further motion until the process restarts.

use kiwi_common::frame::{BodyVector, Pose, WheelId, WheelVector};
use kiwi_common::params::RobotParams;
use kiwi_hal::clock::Clock;
use kiwi_hal::driver::MotorPins;
use kiwi_hal::encoder::Encoder;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::kinematics::Kinematics;
use crate::movements::{FiniteMovement, IndefiniteMovement, MovementsQueue, ScheduleError, Target};
use crate::wheel::{PidGains, Wheel, WheelError};

/// Rejected robot-level operations.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RobotError {
    /// `home` requires the last measured displacement to be exactly zero.
    #[error("cannot home while moving")]
    Moving,

    /// Operation refused while the emergency stop is latched.
    #[error("emergency stop is latched")]
    Halted,

    /// A setter received an out-of-domain value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
}

/// The robot: three wheels, geometry, pose and scheduler.
pub struct Robot<P: MotorPins, E: Encoder, C: Clock> {
    /// Wheels in [`WheelId`] order: right, back, left.
    wheels: [Wheel<P, E>; 3],
    kinematics: Kinematics,
    movements: MovementsQueue,
    clock: C,
    pose: Pose,
    last_displacement: BodyVector,
    /// Timestamp of the previous tick [ms]; 0 = no tick yet.
    last_ms: u64,
    halted: bool,
}

impl<P: MotorPins, E: Encoder, C: Clock> Robot<P, E, C> {
    /// Assemble a robot from its wheels (right, back, left order), a clock
    /// and a validated parameter record.
    pub fn new(wheels: [Wheel<P, E>; 3], clock: C, params: &RobotParams) -> Self {
        let mut robot = Self {
            wheels,
            kinematics: Kinematics::new(params.wheel_radius, params.robot_radius),
            movements: MovementsQueue::new(),
            clock,
            pose: Pose::ORIGIN,
            last_displacement: BodyVector::ZERO,
            last_ms: 0,
            halted: false,
        };
        robot.movements.set_friction(BodyVector::new(
            params.friction_forward,
            params.friction_strafe,
            params.friction_theta,
        ));
        let gains = PidGains {
            kp: params.kp,
            ki: params.ki,
            kd: params.kd,
        };
        for wheel in &mut robot.wheels {
            wheel.set_gains(gains);
            wheel.set_max_speed(params.max_wheel_speed);
        }
        info!(
            wheel_radius = params.wheel_radius,
            robot_radius = params.robot_radius,
            max_wheel_speed = params.max_wheel_speed,
            "robot initialised"
        );
        robot
    }

    // ── Per-tick step ───────────────────────────────────────────────

    /// Run one control tick.
    ///
    /// Never returns an error: a wheel rejecting its speed request
    /// latches the emergency stop instead.
    pub fn tick(&mut self) {
        let now_us = self.clock.now_us().max(1);
        let now_ms = (now_us / 1000).max(1);

        let rotations = WheelVector::new(
            self.wheels[WheelId::Right.index()].handle(now_us),
            self.wheels[WheelId::Back.index()].handle(now_us),
            self.wheels[WheelId::Left.index()].handle(now_us),
        );

        let displacement = self.kinematics.forward(&rotations);
        self.pose = crate::odometry::advance(&self.pose, &displacement);
        self.last_displacement = displacement;

        let dt_ms = if self.last_ms == 0 {
            0
        } else {
            now_ms.saturating_sub(self.last_ms)
        };
        let current_speed = if dt_ms == 0 {
            BodyVector::ZERO
        } else {
            displacement.scaled(1000.0 / dt_ms as f64)
        };

        let target = self.movements.handle(&self.pose, &current_speed, now_ms);
        if let Err(error) = self.apply_target(target) {
            warn!(%error, "wheel rejected target velocity, latching emergency stop");
            self.emergency_stop();
        }

        self.last_ms = now_ms;
    }

    fn apply_target(&mut self, target: Target) -> Result<(), WheelError> {
        match target {
            Target::Absolute(v) => {
                let speeds = self.kinematics.inverse(&v);
                for id in WheelId::ALL {
                    self.wheels[id.index()].set_speed(speeds.wheel(id))?;
                }
            }
            Target::Normalised(v) => {
                let fractions = Kinematics::inverse_normalised(&v);
                for id in WheelId::ALL {
                    self.wheels[id.index()].set_normalised_speed(fractions.wheel(id))?;
                }
            }
        }
        Ok(())
    }

    // ── High-level control ──────────────────────────────────────────

    /// Reset the pose estimate to the origin.
    ///
    /// Permitted only when the last measured body displacement is exactly
    /// zero on all three axes.
    pub fn home(&mut self) -> Result<(), RobotError> {
        if self.last_displacement != BodyVector::ZERO {
            return Err(RobotError::Moving);
        }
        self.pose = Pose::ORIGIN;
        info!("pose reset to origin");
        Ok(())
    }

    /// Latch the emergency stop: every wheel's maximum speed drops to
    /// zero and all further motion is refused. Recovery requires a
    /// process restart.
    pub fn emergency_stop(&mut self) {
        for wheel in &mut self.wheels {
            wheel.set_max_speed(0.0);
        }
        self.halted = true;
        warn!("emergency stop latched");
    }

    /// Replace the scheduler's indefinite fallback.
    pub fn set_indefinite(&mut self, movement: IndefiniteMovement) {
        self.movements.set_indefinite(movement);
    }

    /// Queue a finite movement.
    pub fn enqueue(&mut self, movement: FiniteMovement) -> Result<(), ScheduleError> {
        self.movements.enqueue(movement)
    }

    /// Install `Still`, dropping any other indefinite movement.
    pub fn stop(&mut self) {
        self.movements.stop();
    }

    /// Abort the queued program: drain all finite movements and rest.
    pub fn clear_movements(&mut self) {
        self.movements.clear();
        debug!("movement queue drained");
    }

    // ── Setters ─────────────────────────────────────────────────────

    pub fn set_wheel_radius(&mut self, radius: f64) -> Result<(), RobotError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(RobotError::InvalidParameter("wheel radius must be > 0"));
        }
        self.kinematics.set_wheel_radius(radius);
        Ok(())
    }

    pub fn set_robot_radius(&mut self, radius: f64) -> Result<(), RobotError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(RobotError::InvalidParameter("robot radius must be > 0"));
        }
        self.kinematics.set_chassis_radius(radius);
        Ok(())
    }

    pub fn set_pid_gains(&mut self, kp: f64, ki: f64, kd: f64) -> Result<(), RobotError> {
        if ![kp, ki, kd].iter().all(|g| g.is_finite()) {
            return Err(RobotError::InvalidParameter("PID gains must be finite"));
        }
        let gains = PidGains { kp, ki, kd };
        for wheel in &mut self.wheels {
            wheel.set_gains(gains);
        }
        Ok(())
    }

    /// Change the wheel speed limit. Refused while the emergency stop is
    /// latched — raising the limit would silently defeat the latch.
    pub fn set_max_wheel_speed(&mut self, max_speed: f64) -> Result<(), RobotError> {
        if self.halted {
            return Err(RobotError::Halted);
        }
        if !max_speed.is_finite() || max_speed < 0.0 {
            return Err(RobotError::InvalidParameter("max speed must be >= 0"));
        }
        for wheel in &mut self.wheels {
            wheel.set_max_speed(max_speed);
        }
        Ok(())
    }

    pub fn set_friction(&mut self, friction: BodyVector) -> Result<(), RobotError> {
        let coefficients = [friction.forward, friction.strafe, friction.theta];
        if !coefficients.iter().all(|c| c.is_finite() && *c >= 0.0) {
            return Err(RobotError::InvalidParameter("friction must be >= 0"));
        }
        self.movements.set_friction(friction);
        Ok(())
    }

    // ── Telemetry ───────────────────────────────────────────────────

    #[inline]
    pub const fn pose(&self) -> Pose {
        self.pose
    }

    #[inline]
    pub const fn last_displacement(&self) -> BodyVector {
        self.last_displacement
    }

    #[inline]
    pub fn queued_movements(&self) -> usize {
        self.movements.len()
    }

    #[inline]
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    #[cfg(test)]
    pub(crate) fn wheel(&self, id: WheelId) -> &Wheel<P, E> {
        &self.wheels[id.index()]
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
