//! # Kiwi HAL
//!
//! Hardware abstraction for the kiwi-drive chassis: the motor-driver pin
//! contracts with the two supported H-bridge wirings, the incremental
//! encoder contract, the monotonic clock contract, and a simulation
//! backend implementing all three for host-side runs and tests.
//!
//! The control crate is generic over these traits; production firmware
//! supplies pin types bound to real peripherals, the simulation supplies
//! a first-order motor model.

pub mod clock;
pub mod driver;
pub mod encoder;
pub mod sim;
