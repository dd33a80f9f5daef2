//! Movement scheduler: a bounded FIFO of finite primitives over one
//! indefinite fallback.
//!
//! The queue holds at most [`MAX_MOVEMENTS`] finite movements inline — no
//! allocation in the control loop. Enqueueing a finite movement first
//! installs `Still` as the fallback, so a drained program always comes to
//! rest. A full queue rejects the new primitive; the caller decides
//! whether to retry later.

use heapless::Vec;
use kiwi_common::consts::MAX_MOVEMENTS;
use kiwi_common::frame::{BodyVector, Pose};
use thiserror::Error;
use tracing::debug;

use super::{FiniteMovement, IndefiniteMovement, Target};

/// Scheduler rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// The queue already holds [`MAX_MOVEMENTS`] finite movements.
    #[error("movement queue is full ({MAX_MOVEMENTS} movements)")]
    QueueFull,
}

/// Bounded movement queue plus indefinite fallback.
pub struct MovementsQueue {
    queue: Vec<FiniteMovement, MAX_MOVEMENTS>,
    fallback: IndefiniteMovement,
    /// Per-axis braking-space friction coefficients.
    friction: BodyVector,
}

impl Default for MovementsQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MovementsQueue {
    /// An empty scheduler resting on `Still`.
    pub fn new() -> Self {
        Self {
            queue: Vec::new(),
            fallback: IndefiniteMovement::Still,
            friction: BodyVector::ZERO,
        }
    }

    /// Configure the braking-space friction coefficients.
    pub fn set_friction(&mut self, friction: BodyVector) {
        self.friction = friction;
    }

    #[inline]
    pub const fn friction(&self) -> BodyVector {
        self.friction
    }

    /// Number of queued finite movements.
    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Currently installed indefinite fallback.
    #[inline]
    pub const fn fallback(&self) -> &IndefiniteMovement {
        &self.fallback
    }

    /// Install `Still` as the fallback, releasing any prior indefinite
    /// movement. Idempotent.
    pub fn stop(&mut self) {
        self.fallback = IndefiniteMovement::Still;
    }

    /// Replace the indefinite fallback.
    pub fn set_indefinite(&mut self, movement: IndefiniteMovement) {
        debug!(?movement, "installing indefinite movement");
        self.fallback = movement;
    }

    /// Append a finite movement.
    ///
    /// Installs `Still` as the fallback first, so the program ends at rest
    /// whether or not the append succeeds. On a full queue the movement is
    /// dropped and the call fails.
    pub fn enqueue(&mut self, movement: FiniteMovement) -> Result<(), ScheduleError> {
        self.stop();
        self.queue.push(movement).map_err(|_| {
            debug!("movement queue full, rejecting");
            ScheduleError::QueueFull
        })?;
        debug!(queued = self.queue.len(), "finite movement enqueued");
        Ok(())
    }

    /// Drop every queued finite movement and rest on `Still`.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.stop();
    }

    /// Per-tick scheduling step.
    ///
    /// Dequeues every leading movement whose completion test fires, then
    /// asks the new head — or the fallback when the queue is empty — for
    /// this tick's target velocity. `current_speed` feeds the braking-space
    /// estimate friction·speed² used by the completion brackets.
    pub fn handle(&mut self, pose: &Pose, current_speed: &BodyVector, now_ms: u64) -> Target {
        let braking = BodyVector::new(
            self.friction.forward * current_speed.forward * current_speed.forward,
            self.friction.strafe * current_speed.strafe * current_speed.strafe,
            self.friction.theta * current_speed.theta * current_speed.theta,
        );

        while let Some(head) = self.queue.first_mut() {
            if head.is_finished(pose, &braking, now_ms) {
                self.queue.remove(0);
                debug!(remaining = self.queue.len(), "finite movement complete");
            } else {
                break;
            }
        }

        match self.queue.first() {
            Some(head) => head.velocity(pose, now_ms),
            None => self.fallback.velocity(),
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
