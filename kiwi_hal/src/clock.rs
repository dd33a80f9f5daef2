//! Wall-clock contract.

use std::time::Instant;

/// Monotonic time source.
///
/// The wheel controllers work in microseconds, the movement scheduler in
/// milliseconds. A reading of exactly 0 is reserved as "uninitialised" by
/// parts of the scheduler; callers substitute 1 where that matters.
pub trait Clock {
    /// Microseconds since an arbitrary fixed origin.
    fn now_us(&self) -> u64;

    /// Milliseconds since the same origin.
    fn now_ms(&self) -> u64 {
        self.now_us() / 1000
    }
}

/// Process-lifetime monotonic clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}
