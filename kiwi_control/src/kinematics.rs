//! Body ↔ wheel velocity transform.
//!
//! Wheels sit 120° apart with axes tangent to a circle of radius L; the
//! transform only depends on the wheel radius R and chassis radius L.
//! The trigonometric factors are fixed by the 2/6/10 o'clock layout:
//! sin 30° = 0.5, cos 30° = √3/2, cos 180° = −1.

use kiwi_common::frame::{BodyVector, WheelVector};

const SIN_30: f64 = 0.5;
const COS_30: f64 = 0.866_025_403_784_438_6;
const COS_180: f64 = -1.0;
const TAN_30: f64 = 0.577_350_269_189_625_7;

/// Chassis geometry with the derived forward-transform coefficients.
#[derive(Debug, Clone, Copy)]
pub struct Kinematics {
    /// Wheel radius R [m].
    wheel_radius: f64,
    /// Chassis radius L [m].
    chassis_radius: f64,
    /// R·tan30 — forward component per (ΔR − ΔL).
    fwd_coeff: f64,
    /// R/3 — strafe component per (ΔR − 2ΔB + ΔL).
    str_coeff: f64,
    /// R/(3L) — theta component per (ΔR + ΔB + ΔL).
    theta_coeff: f64,
}

impl Kinematics {
    /// Geometry for the given wheel and chassis radii [m]; both must be
    /// strictly positive.
    pub fn new(wheel_radius: f64, chassis_radius: f64) -> Self {
        let mut kinematics = Self {
            wheel_radius,
            chassis_radius,
            fwd_coeff: 0.0,
            str_coeff: 0.0,
            theta_coeff: 0.0,
        };
        kinematics.refresh();
        kinematics
    }

    fn refresh(&mut self) {
        self.fwd_coeff = self.wheel_radius * TAN_30;
        self.str_coeff = self.wheel_radius / 3.0;
        self.theta_coeff = self.wheel_radius / (3.0 * self.chassis_radius);
    }

    pub fn set_wheel_radius(&mut self, wheel_radius: f64) {
        self.wheel_radius = wheel_radius;
        self.refresh();
    }

    pub fn set_chassis_radius(&mut self, chassis_radius: f64) {
        self.chassis_radius = chassis_radius;
        self.refresh();
    }

    #[inline]
    pub const fn wheel_radius(&self) -> f64 {
        self.wheel_radius
    }

    #[inline]
    pub const fn chassis_radius(&self) -> f64 {
        self.chassis_radius
    }

    /// Inverse kinematics: body velocity [m/s, m/s, rad/s] → wheel angular
    /// speeds [rad/s].
    pub fn inverse(&self, v: &BodyVector) -> WheelVector {
        let rotation = self.chassis_radius * v.theta;
        WheelVector::new(
            (SIN_30 * v.strafe + COS_30 * v.forward + rotation) / self.wheel_radius,
            (COS_180 * v.strafe + rotation) / self.wheel_radius,
            (SIN_30 * v.strafe - COS_30 * v.forward + rotation) / self.wheel_radius,
        )
    }

    /// Normalised inverse kinematics: the same projection with the
    /// geometry factored out, mapping normalised body speeds to normalised
    /// wheel-speed fractions.
    pub fn inverse_normalised(v: &BodyVector) -> WheelVector {
        WheelVector::new(
            SIN_30 * v.strafe + COS_30 * v.forward + v.theta,
            COS_180 * v.strafe + v.theta,
            SIN_30 * v.strafe - COS_30 * v.forward + v.theta,
        )
    }

    /// Forward kinematics: wheel angular displacements [rad] → body
    /// displacement [m, m, rad].
    pub fn forward(&self, w: &WheelVector) -> BodyVector {
        BodyVector::new(
            self.fwd_coeff * (w.right - w.left),
            self.str_coeff * (w.right - 2.0 * w.back + w.left),
            self.theta_coeff * (w.right + w.back + w.left),
        )
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
