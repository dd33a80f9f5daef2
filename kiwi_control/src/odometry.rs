//! World-frame pose integration.
//!
//! Body displacements are rotated into the world frame at the midpoint
//! heading φ + Δθ/2. The second-order (midpoint) rule cancels the
//! first-order error a start-of-tick heading would accumulate along curved
//! paths; with the small per-tick displacements of the control loop the
//! residual is negligible.

use kiwi_common::frame::{BodyVector, Pose, wrap_angle};

/// Integrate one body-frame displacement into the pose estimate.
///
/// The heading is wrapped back into [0, 2π) after every update.
pub fn advance(pose: &Pose, displacement: &BodyVector) -> Pose {
    let midpoint = pose.phi + displacement.theta / 2.0;
    let (sin, cos) = midpoint.sin_cos();
    Pose::new(
        pose.x + displacement.forward * cos - displacement.strafe * sin,
        pose.y + displacement.forward * sin + displacement.strafe * cos,
        wrap_angle(pose.phi + displacement.theta),
    )
}

// ─── Tests ──────────────────────────────────────────────────────────
