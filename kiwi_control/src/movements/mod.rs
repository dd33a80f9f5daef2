//! Motion primitives.
//!
//! The primitive set is a tagged sum split into two kinds:
//!
//! - [`IndefiniteMovement`] — runs until replaced. `Still` is the unit
//!   fallback; nothing to allocate or free.
//! - [`FiniteMovement`] — runs until its completion test fires, then is
//!   dequeued by the scheduler.
//!
//! Each primitive emits one body-frame target velocity per tick, tagged as
//! absolute (m/s, rad/s) or normalised (fractions of the wheel maximum).
//! Pose-seeking primitives track per-axis completion with latched flags:
//! an axis that once entered its done bracket stops emitting even if later
//! drift pulls it back out.
//!
//! A millisecond timestamp of 0 means "not started yet"; a clock that
//! genuinely reads 0 is substituted with 1.

pub mod queue;

pub use queue::{MovementsQueue, ScheduleError};

use bitflags::bitflags;
use kiwi_common::consts::{ANGULAR_TOLERANCE, LINEAR_TOLERANCE};
use kiwi_common::frame::{Axis, BodyVector, Pose};

bitflags! {
    /// Latched per-axis completion flags of a pose-seeking primitive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AxisDone: u8 {
        const FORWARD = 1 << 0;
        const STRAFE = 1 << 1;
        const THETA = 1 << 2;
    }
}

impl AxisDone {
    fn flag(axis: Axis) -> Self {
        match axis {
            Axis::Forward => Self::FORWARD,
            Axis::Strafe => Self::STRAFE,
            Axis::Theta => Self::THETA,
        }
    }
}

/// Completion tolerance for an axis.
#[inline]
fn tolerance(axis: Axis) -> f64 {
    match axis {
        Axis::Forward | Axis::Strafe => LINEAR_TOLERANCE,
        Axis::Theta => ANGULAR_TOLERANCE,
    }
}

/// Body-frame target velocity for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    /// Absolute units: m/s on the planar axes, rad/s on theta.
    Absolute(BodyVector),
    /// Fractions of the maximum wheel speed.
    Normalised(BodyVector),
}

impl Target {
    /// The velocity vector regardless of tagging.
    #[inline]
    pub const fn vector(&self) -> BodyVector {
        match self {
            Self::Absolute(v) | Self::Normalised(v) => *v,
        }
    }
}

/// Rebalanced normalised magnitude: sign(m)·m² / (|m| + |m₀|).
///
/// Splitting a planar and an angular norm this way bounds their combined
/// magnitude: eff(m, m₀) + eff(m₀, m) ≤ max(|m|, |m₀|), so wheel demand
/// stays within normalised range when both inputs do.
#[inline]
pub fn rebalanced(m: f64, other: f64) -> f64 {
    let denominator = m.abs() + other.abs();
    if denominator == 0.0 {
        0.0
    } else {
        m * m.abs() / denominator
    }
}

/// Decompose a normalised (planar, direction, angular) command into a
/// normalised body vector, rebalancing planar against angular.
fn norm_speed_vector(planar: f64, direction: f64, angular: f64) -> BodyVector {
    let planar_eff = rebalanced(planar, angular);
    let angular_eff = rebalanced(angular, planar);
    BodyVector::new(
        planar_eff * direction.cos(),
        planar_eff * direction.sin(),
        angular_eff,
    )
}

/// Substitute the reserved 0 with 1 when stamping a start time.
#[inline]
fn stamp(started_ms: &mut u64, now_ms: u64) {
    if *started_ms == 0 {
        *started_ms = now_ms.max(1);
    }
}

/// Latch done flags for every axis inside its completion bracket.
fn update_done(done: &mut AxisDone, displacement: &BodyVector, braking: &BodyVector) {
    for axis in Axis::ALL {
        let bracket = braking.axis(axis).max(tolerance(axis));
        if displacement.axis(axis).abs() <= bracket {
            done.insert(AxisDone::flag(axis));
        }
    }
}

/// Zero out the components of finished axes.
fn mask_done(v: BodyVector, done: AxisDone) -> BodyVector {
    BodyVector::new(
        if done.contains(AxisDone::FORWARD) {
            0.0
        } else {
            v.forward
        },
        if done.contains(AxisDone::STRAFE) {
            0.0
        } else {
            v.strafe
        },
        if done.contains(AxisDone::THETA) {
            0.0
        } else {
            v.theta
        },
    )
}

/// Planar part of `displacement` rescaled to magnitude `speed`, with
/// sign(Δθ)·`angular` on theta.
fn seek_vector(displacement: &BodyVector, speed: f64, angular: f64) -> BodyVector {
    let planar = displacement.planar_norm();
    let (forward, strafe) = if planar > 0.0 {
        (
            displacement.forward / planar * speed,
            displacement.strafe / planar * speed,
        )
    } else {
        (0.0, 0.0)
    };
    let theta = if displacement.theta == 0.0 {
        0.0
    } else {
        angular.copysign(displacement.theta)
    };
    BodyVector::new(forward, strafe, theta)
}

// ─── Indefinite primitives ──────────────────────────────────────────

/// A primitive that runs until replaced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndefiniteMovement {
    /// Emit zero velocity forever. The scheduler's resting state.
    Still,
    /// Emit a constant absolute body velocity.
    Speed(BodyVector),
    /// Emit a constant normalised velocity from (planar, direction,
    /// angular) norms, rebalanced.
    NormSpeed {
        planar: f64,
        direction: f64,
        angular: f64,
    },
}

impl IndefiniteMovement {
    /// Target velocity for this tick.
    pub fn velocity(&self) -> Target {
        match self {
            Self::Still => Target::Normalised(BodyVector::ZERO),
            Self::Speed(v) => Target::Absolute(*v),
            Self::NormSpeed {
                planar,
                direction,
                angular,
            } => Target::Normalised(norm_speed_vector(*planar, *direction, *angular)),
        }
    }
}

// ─── Finite primitives ──────────────────────────────────────────────

/// A primitive that completes, then leaves the queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FiniteMovement {
    /// Reach a world pose within a time budget. Completes on timeout or
    /// when every axis is inside its bracket.
    SpaceTime {
        target: Pose,
        duration_ms: u64,
        started_ms: u64,
        done: AxisDone,
    },
    /// Reach a world pose at fixed speed magnitudes. Completes purely by
    /// the per-axis bracket test.
    SpaceSpeed {
        target: Pose,
        planar_speed: f64,
        angular_speed: f64,
        done: AxisDone,
    },
    /// As [`FiniteMovement::SpaceSpeed`], with rebalanced normalised
    /// magnitudes.
    SpaceNormSpeed {
        target: Pose,
        planar_norm: f64,
        angular_norm: f64,
        done: AxisDone,
    },
    /// Hold an absolute velocity for a duration.
    SpeedTime {
        velocity: BodyVector,
        duration_ms: u64,
        started_ms: u64,
    },
    /// Hold a normalised (planar, direction, angular) velocity for a
    /// duration.
    NormSpeedTime {
        planar: f64,
        direction: f64,
        angular: f64,
        duration_ms: u64,
        started_ms: u64,
    },
}

/// Seconds → milliseconds for the public duration parameters.
#[inline]
fn duration_to_ms(duration_s: f64) -> u64 {
    (duration_s * 1000.0).round() as u64
}

impl FiniteMovement {
    pub fn space_time(target: Pose, duration_s: f64) -> Self {
        Self::SpaceTime {
            target,
            duration_ms: duration_to_ms(duration_s),
            started_ms: 0,
            done: AxisDone::empty(),
        }
    }

    pub fn space_speed(target: Pose, planar_speed: f64, angular_speed: f64) -> Self {
        Self::SpaceSpeed {
            target,
            planar_speed,
            angular_speed,
            done: AxisDone::empty(),
        }
    }

    pub fn space_norm_speed(target: Pose, planar_norm: f64, angular_norm: f64) -> Self {
        Self::SpaceNormSpeed {
            target,
            planar_norm,
            angular_norm,
            done: AxisDone::empty(),
        }
    }

    pub fn speed_time(velocity: BodyVector, duration_s: f64) -> Self {
        Self::SpeedTime {
            velocity,
            duration_ms: duration_to_ms(duration_s),
            started_ms: 0,
        }
    }

    pub fn norm_speed_time(planar: f64, direction: f64, angular: f64, duration_s: f64) -> Self {
        Self::NormSpeedTime {
            planar,
            direction,
            angular,
            duration_ms: duration_to_ms(duration_s),
            started_ms: 0,
        }
    }

    /// Completion test for this tick.
    ///
    /// Duration-bounded variants stamp their start time on first
    /// observation. Pose-seeking variants latch per-axis done flags from
    /// the bracket max(braking, tolerance) before aggregating.
    pub fn is_finished(&mut self, pose: &Pose, braking: &BodyVector, now_ms: u64) -> bool {
        match self {
            Self::SpaceTime {
                target,
                duration_ms,
                started_ms,
                done,
            } => {
                stamp(started_ms, now_ms);
                if now_ms.saturating_sub(*started_ms) >= *duration_ms {
                    return true;
                }
                let displacement = pose.body_displacement_to(target);
                update_done(done, &displacement, braking);
                done.is_all()
            }
            Self::SpaceSpeed { target, done, .. } | Self::SpaceNormSpeed { target, done, .. } => {
                let displacement = pose.body_displacement_to(target);
                update_done(done, &displacement, braking);
                done.is_all()
            }
            Self::SpeedTime {
                duration_ms,
                started_ms,
                ..
            }
            | Self::NormSpeedTime {
                duration_ms,
                started_ms,
                ..
            } => {
                stamp(started_ms, now_ms);
                now_ms.saturating_sub(*started_ms) >= *duration_ms
            }
        }
    }

    /// Target velocity for this tick.
    pub fn velocity(&self, pose: &Pose, now_ms: u64) -> Target {
        match self {
            Self::SpaceTime {
                target,
                duration_ms,
                started_ms,
                done,
            } => {
                let started = if *started_ms == 0 {
                    now_ms.max(1)
                } else {
                    *started_ms
                };
                let elapsed = now_ms.saturating_sub(started);
                let remaining_s = duration_ms.saturating_sub(elapsed) as f64 / 1000.0;
                if remaining_s <= 0.0 {
                    return Target::Absolute(BodyVector::ZERO);
                }
                let displacement = pose.body_displacement_to(target);
                Target::Absolute(mask_done(displacement.scaled(1.0 / remaining_s), *done))
            }
            Self::SpaceSpeed {
                target,
                planar_speed,
                angular_speed,
                done,
            } => {
                let displacement = pose.body_displacement_to(target);
                Target::Absolute(mask_done(
                    seek_vector(&displacement, *planar_speed, *angular_speed),
                    *done,
                ))
            }
            Self::SpaceNormSpeed {
                target,
                planar_norm,
                angular_norm,
                done,
            } => {
                let displacement = pose.body_displacement_to(target);
                let planar_eff = rebalanced(*planar_norm, *angular_norm);
                let angular_eff = rebalanced(*angular_norm, *planar_norm);
                Target::Normalised(mask_done(
                    seek_vector(&displacement, planar_eff, angular_eff),
                    *done,
                ))
            }
            Self::SpeedTime { velocity, .. } => Target::Absolute(*velocity),
            Self::NormSpeedTime {
                planar,
                direction,
                angular,
                ..
            } => Target::Normalised(norm_speed_vector(*planar, *direction, *angular)),
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::{FRAC_PI_2, PI};

    const EPS: f64 = 1e-12;
    const NO_BRAKING: BodyVector = BodyVector::ZERO;

    #[test]
    fn rebalancing_never_exceeds_input() {
        for (m, other) in [
            (1.0, 1.0),
            (0.5, 0.2),
            (-0.7, 0.3),
            (0.0, 1.0),
            (1.0, 0.0),
            (-1.0, -1.0),
        ] {
            let eff = rebalanced(m, other);
            assert!(eff.abs() <= m.abs() + EPS, "eff({m}, {other}) = {eff}");
        }
        // Degenerate both-zero case.
        assert_eq!(rebalanced(0.0, 0.0), 0.0);
    }

    #[test]
    fn rebalanced_pair_sums_within_one() {
        for (p, a) in [(1.0, 1.0), (0.8, 0.6), (0.3, 1.0), (1.0, 0.0)] {
            let sum = rebalanced(p, a).abs() + rebalanced(a, p).abs();
            assert!(sum <= 1.0 + EPS, "sum for ({p}, {a}) = {sum}");
        }
    }

    #[test]
    fn rebalanced_keeps_sign() {
        assert!(rebalanced(-0.5, 0.2) < 0.0);
        assert!(rebalanced(0.5, -0.2) > 0.0);
    }

    #[test]
    fn still_emits_normalised_zero() {
        assert_eq!(
            IndefiniteMovement::Still.velocity(),
            Target::Normalised(BodyVector::ZERO)
        );
    }

    #[test]
    fn speed_indefinite_passes_through() {
        let v = BodyVector::new(0.5, -0.1, 0.2);
        assert_eq!(
            IndefiniteMovement::Speed(v).velocity(),
            Target::Absolute(v)
        );
    }

    #[test]
    fn norm_speed_decomposes_by_direction() {
        // Pure planar command pointing left (STRAFE).
        let target = IndefiniteMovement::NormSpeed {
            planar: 0.8,
            direction: FRAC_PI_2,
            angular: 0.0,
        }
        .velocity();
        let Target::Normalised(v) = target else {
            panic!("expected normalised target");
        };
        // No angular norm → planar passes through unchanged.
        assert!(v.forward.abs() < EPS);
        assert!((v.strafe - 0.8).abs() < EPS);
        assert_eq!(v.theta, 0.0);
    }

    #[test]
    fn space_time_first_tick_velocity() {
        let mut movement = FiniteMovement::space_time(Pose::new(0.3, 0.4, 0.0), 2.0);
        assert!(!movement.is_finished(&Pose::ORIGIN, &NO_BRAKING, 1));
        let target = movement.velocity(&Pose::ORIGIN, 1);
        let Target::Absolute(v) = target else {
            panic!("expected absolute target");
        };
        assert!((v.forward - 0.15).abs() < EPS);
        assert!((v.strafe - 0.20).abs() < EPS);
        assert_eq!(v.theta, 0.0);
    }

    #[test]
    fn space_time_finishes_on_timeout() {
        let mut movement = FiniteMovement::space_time(Pose::new(5.0, 0.0, 0.0), 2.0);
        let far = Pose::ORIGIN;
        assert!(!movement.is_finished(&far, &NO_BRAKING, 100));
        assert!(!movement.is_finished(&far, &NO_BRAKING, 2_099));
        assert!(movement.is_finished(&far, &NO_BRAKING, 2_100));
    }

    #[test]
    fn space_time_finishes_on_tolerance() {
        let mut movement = FiniteMovement::space_time(Pose::new(0.005, 0.0, 0.0), 10.0);
        // Within 0.01 m and ~1° on every axis straight away.
        assert!(movement.is_finished(&Pose::ORIGIN, &NO_BRAKING, 1));
    }

    #[test]
    fn space_time_zero_clock_substitution() {
        let mut movement = FiniteMovement::space_time(Pose::new(1.0, 0.0, 0.0), 1.0);
        movement.is_finished(&Pose::ORIGIN, &NO_BRAKING, 0);
        let FiniteMovement::SpaceTime { started_ms, .. } = movement else {
            unreachable!();
        };
        assert_eq!(started_ms, 1);
    }

    #[test]
    fn space_time_finished_axis_emits_zero() {
        // Strafe axis already inside tolerance; forward still seeking.
        let mut movement = FiniteMovement::space_time(Pose::new(0.5, 0.005, 0.0), 1.0);
        assert!(!movement.is_finished(&Pose::ORIGIN, &NO_BRAKING, 1));
        let v = movement.velocity(&Pose::ORIGIN, 1).vector();
        assert!(v.forward > 0.0);
        assert_eq!(v.strafe, 0.0);
        assert_eq!(v.theta, 0.0);
    }

    #[test]
    fn space_time_expired_emits_zero() {
        let mut movement = FiniteMovement::space_time(Pose::new(1.0, 0.0, 0.0), 1.0);
        movement.is_finished(&Pose::ORIGIN, &NO_BRAKING, 1);
        let v = movement.velocity(&Pose::ORIGIN, 5_000).vector();
        assert_eq!(v, BodyVector::ZERO);
    }

    #[test]
    fn space_speed_renormalises_planar() {
        let mut movement = FiniteMovement::space_speed(Pose::new(0.3, 0.4, PI), 0.5, 0.2);
        assert!(!movement.is_finished(&Pose::ORIGIN, &NO_BRAKING, 1));
        let v = movement.velocity(&Pose::ORIGIN, 1).vector();
        // Displacement (0.3, 0.4) has norm 0.5 → unit (0.6, 0.8) × 0.5.
        assert!((v.forward - 0.3).abs() < EPS);
        assert!((v.strafe - 0.4).abs() < EPS);
        assert!((v.planar_norm() - 0.5).abs() < EPS);
        // Positive heading error → +angular_speed.
        assert!((v.theta - 0.2).abs() < EPS);
    }

    #[test]
    fn space_speed_angular_sign_follows_arc() {
        let mut movement = FiniteMovement::space_speed(Pose::new(0.0, 0.0, 0.1), 0.5, 0.2);
        // Standing past the target heading → negative shortest arc.
        let pose = Pose::new(0.0, 0.0, 0.3);
        assert!(!movement.is_finished(&pose, &NO_BRAKING, 1));
        let v = movement.velocity(&pose, 1).vector();
        assert!((v.theta + 0.2).abs() < EPS);
    }

    #[test]
    fn space_speed_completes_only_by_tolerance() {
        let mut movement = FiniteMovement::space_speed(Pose::new(0.004, -0.004, 0.0), 0.5, 0.2);
        // No time budget involved.
        assert!(movement.is_finished(&Pose::ORIGIN, &NO_BRAKING, u64::MAX));
    }

    #[test]
    fn braking_space_widens_the_bracket() {
        let mut movement = FiniteMovement::space_speed(Pose::new(0.05, 0.0, 0.0), 0.5, 0.2);
        // 0.05 m out, tolerance alone (0.01) is not enough...
        assert!(!movement.is_finished(&Pose::ORIGIN, &NO_BRAKING, 1));
        // ...but a 0.06 m projected stopping distance is.
        let mut movement = FiniteMovement::space_speed(Pose::new(0.05, 0.0, 0.0), 0.5, 0.2);
        let braking = BodyVector::new(0.06, 0.0, 0.0);
        assert!(movement.is_finished(&Pose::ORIGIN, &braking, 1));
    }

    #[test]
    fn done_flags_latch() {
        let mut movement = FiniteMovement::space_speed(Pose::new(0.2, 0.0, 0.0), 0.5, 0.2);
        // Forward axis completes while sitting close to the target...
        let near = Pose::new(0.195, 0.0, 0.0);
        assert!(movement.is_finished(&near, &NO_BRAKING, 1));

        let mut movement = FiniteMovement::space_speed(Pose::new(0.2, 0.1, 0.0), 0.5, 0.2);
        let partial = Pose::new(0.195, 0.0, 0.0);
        assert!(!movement.is_finished(&partial, &NO_BRAKING, 1));
        // ...and keeps emitting zero on that axis even after drifting out.
        let drifted = Pose::new(0.15, 0.0, 0.0);
        let v = movement.velocity(&drifted, 1).vector();
        assert_eq!(v.forward, 0.0);
        assert!(v.strafe > 0.0);
    }

    #[test]
    fn space_norm_speed_is_normalised_and_rebalanced() {
        let mut movement = FiniteMovement::space_norm_speed(Pose::new(1.0, 0.0, 1.0), 0.8, 0.4);
        assert!(!movement.is_finished(&Pose::ORIGIN, &NO_BRAKING, 1));
        let target = movement.velocity(&Pose::ORIGIN, 1);
        let Target::Normalised(v) = target else {
            panic!("expected normalised target");
        };
        let planar_eff = rebalanced(0.8, 0.4);
        let angular_eff = rebalanced(0.4, 0.8);
        assert!((v.forward - planar_eff).abs() < EPS);
        assert!(v.strafe.abs() < EPS);
        assert!((v.theta - angular_eff).abs() < EPS);
        assert!(v.planar_norm() + v.theta.abs() <= 1.0 + EPS);
    }

    #[test]
    fn speed_time_emits_constant_velocity() {
        let v = BodyVector::new(0.1, 0.2, 0.3);
        let mut movement = FiniteMovement::speed_time(v, 1.5);
        assert!(!movement.is_finished(&Pose::ORIGIN, &NO_BRAKING, 10));
        assert_eq!(movement.velocity(&Pose::ORIGIN, 10), Target::Absolute(v));
        // Duration only: pose is irrelevant.
        assert!(!movement.is_finished(&Pose::ORIGIN, &NO_BRAKING, 1_509));
        assert!(movement.is_finished(&Pose::ORIGIN, &NO_BRAKING, 1_510));
    }

    #[test]
    fn norm_speed_time_decomposes() {
        let mut movement = FiniteMovement::norm_speed_time(0.6, 0.0, 0.0, 1.0);
        assert!(!movement.is_finished(&Pose::ORIGIN, &NO_BRAKING, 5));
        let Target::Normalised(v) = movement.velocity(&Pose::ORIGIN, 5) else {
            panic!("expected normalised target");
        };
        assert!((v.forward - 0.6).abs() < EPS);
        assert_eq!(v.theta, 0.0);
        assert!(movement.is_finished(&Pose::ORIGIN, &NO_BRAKING, 1_005));
    }
}
