//! Coordinate frame types and angle helpers.
//!
//! Two frames are used throughout the workspace:
//!
//! - **Body frame** — attached to the chassis. FORWARD points opposite the
//!   BACK wheel, STRAFE is 90° anti-clockwise from FORWARD (robot's left),
//!   THETA is positive anti-clockwise seen from above.
//! - **World frame** — fixed to the environment as (x, y, phi). At phi = 0
//!   the world x axis coincides with body FORWARD. phi is kept in [0, 2π).
//!
//! Wheels sit at 2, 6 and 10 o'clock (RIGHT, BACK, LEFT) with FORWARD at 12.

use core::f64::consts::{PI, TAU};
use serde::{Deserialize, Serialize};

// ─── Axes and wheels ────────────────────────────────────────────────

/// The three body-frame axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Axis {
    /// Translation along the chassis forward direction.
    Forward = 0,
    /// Translation towards the robot's left.
    Strafe = 1,
    /// Rotation about the vertical, anti-clockwise positive.
    Theta = 2,
}

impl Axis {
    /// All axes, in component order.
    pub const ALL: [Self; 3] = [Self::Forward, Self::Strafe, Self::Theta];
}

/// The three driven wheels, named by their clock position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WheelId {
    /// 2 o'clock.
    Right = 0,
    /// 6 o'clock.
    Back = 1,
    /// 10 o'clock.
    Left = 2,
}

impl WheelId {
    /// All wheels, in component order.
    pub const ALL: [Self; 3] = [Self::Right, Self::Back, Self::Left];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

// ─── Body-frame vector ──────────────────────────────────────────────

/// A body-frame triple: velocity [m/s, m/s, rad/s], displacement
/// [m, m, rad], or a per-axis scalar such as friction coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BodyVector {
    /// FORWARD component.
    pub forward: f64,
    /// STRAFE component.
    pub strafe: f64,
    /// THETA component.
    pub theta: f64,
}

impl BodyVector {
    /// The zero vector.
    pub const ZERO: Self = Self {
        forward: 0.0,
        strafe: 0.0,
        theta: 0.0,
    };

    pub const fn new(forward: f64, strafe: f64, theta: f64) -> Self {
        Self {
            forward,
            strafe,
            theta,
        }
    }

    /// Component along the given axis.
    #[inline]
    pub const fn axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Forward => self.forward,
            Axis::Strafe => self.strafe,
            Axis::Theta => self.theta,
        }
    }

    /// Component-wise scaling.
    #[inline]
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(
            self.forward * factor,
            self.strafe * factor,
            self.theta * factor,
        )
    }

    /// Euclidean norm of the planar (FORWARD, STRAFE) part.
    #[inline]
    pub fn planar_norm(&self) -> f64 {
        self.forward.hypot(self.strafe)
    }
}

// ─── Wheel-frame vector ─────────────────────────────────────────────

/// A per-wheel triple: angular speeds [rad/s] or displacements [rad].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelVector {
    /// RIGHT wheel component.
    pub right: f64,
    /// BACK wheel component.
    pub back: f64,
    /// LEFT wheel component.
    pub left: f64,
}

impl WheelVector {
    pub const fn new(right: f64, back: f64, left: f64) -> Self {
        Self { right, back, left }
    }

    /// Component for the given wheel.
    #[inline]
    pub const fn wheel(&self, id: WheelId) -> f64 {
        match id {
            WheelId::Right => self.right,
            WheelId::Back => self.back,
            WheelId::Left => self.left,
        }
    }
}

// ─── World-frame pose ───────────────────────────────────────────────

/// World-frame pose estimate (x [m], y [m], phi [rad]).
///
/// phi is maintained in [0, 2π) by every odometry update.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub phi: f64,
}

impl Pose {
    /// The home pose.
    pub const ORIGIN: Self = Self {
        x: 0.0,
        y: 0.0,
        phi: 0.0,
    };

    pub const fn new(x: f64, y: f64, phi: f64) -> Self {
        Self { x, y, phi }
    }

    /// Body-frame displacement from this pose to `target`.
    ///
    /// The world-frame offset is rotated into the body frame using the
    /// current heading; the angular component is the shortest signed arc
    /// between the two headings.
    pub fn body_displacement_to(&self, target: &Pose) -> BodyVector {
        let dx = target.x - self.x;
        let dy = target.y - self.y;
        let (sin, cos) = self.phi.sin_cos();
        BodyVector::new(
            dx * cos + dy * sin,
            -dx * sin + dy * cos,
            shortest_arc(self.phi, target.phi),
        )
    }
}

// ─── Angle helpers ──────────────────────────────────────────────────

/// Wrap an angle into [0, 2π) by repeated addition/subtraction of 2π.
///
/// Per-tick heading increments are small, so the loops run at most a
/// handful of iterations.
#[inline]
pub fn wrap_angle(mut angle: f64) -> f64 {
    while angle >= TAU {
        angle -= TAU;
    }
    while angle < 0.0 {
        angle += TAU;
    }
    angle
}

/// Shortest signed arc from `from` to `to` [rad], in (-π, π].
///
/// Positive means the anti-clockwise direction is shorter.
#[inline]
pub fn shortest_arc(from: f64, to: f64) -> f64 {
    let mut arc = to - from;
    while arc > PI {
        arc -= TAU;
    }
    while arc < -PI {
        arc += TAU;
    }
    arc
}

// ─── Tests ──────────────────────────────────────────────────────────
