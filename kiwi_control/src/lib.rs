//! # Kiwi Control
//!
//! Motion-control core for a three-wheel holonomic (kiwi-drive) chassis.
//! A single cooperative control loop ties together:
//!
//! 1. **Wheel** — per-wheel PID driving measured angular velocity toward a
//!    commanded one, against an incremental encoder.
//! 2. **Kinematics** — the pure body ↔ wheel velocity transform.
//! 3. **Odometry** — midpoint-heading integration of body displacements
//!    into a world-frame pose.
//! 4. **Movements** — a bounded queue of finite motion primitives over a
//!    single indefinite fallback, emitting one target velocity per tick.
//! 5. **Robot** — the coordinator running the tick and the byte-framed
//!    command surface.
//!
//! The loop surface is infallible: a rejected wheel command latches the
//! emergency stop instead of aborting the tick.

pub mod command;
pub mod kinematics;
pub mod movements;
pub mod odometry;
pub mod robot;
pub mod wheel;
