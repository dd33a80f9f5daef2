//! Incremental encoder contract.

/// Incremental wheel encoder.
///
/// `read` returns a monotonic step count: the cumulative number of encoder
/// steps since construction, signed by rotation direction. Implementations
/// own hardware-counter wraparound — a counter overflow between two
/// consecutive reads must not surface as a large spurious delta.
pub trait Encoder {
    fn read(&mut self) -> i64;
}
