//! # Kiwi Common Library
//!
//! Shared vocabulary for the kiwi-drive motion control workspace: the
//! body/world coordinate frame types, the chassis geometry and encoder
//! constants, and the persistent robot parameter record.
//!
//! Everything in here is plain data — no hardware access, no control logic.

pub mod consts;
pub mod frame;
pub mod params;
