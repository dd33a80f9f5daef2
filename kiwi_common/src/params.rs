//! Persistent robot parameter record.
//!
//! The record exists in two interchangeable encodings:
//!
//! - a packed little-endian binary blob (nine f64 fields, 72 bytes) as
//!   stored by the on-board stable-storage loader, and
//! - a TOML file for bench configuration.
//!
//! Both load paths run the same validation.

use std::path::Path;

use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;
use thiserror::Error;

/// Size of the packed binary encoding [bytes].
pub const PARAMS_BLOB_LEN: usize = 72;

const_assert_eq!(PARAMS_BLOB_LEN, 9 * size_of::<f64>());

/// Errors raised while loading or validating a parameter record.
#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("failed to read {path}: {detail}")]
    Io { path: String, detail: String },

    #[error("parameter parse error: {0}")]
    Parse(String),

    #[error("parameter blob is {got} bytes, expected {PARAMS_BLOB_LEN}")]
    BlobLength { got: usize },

    #[error("parameter validation: {0}")]
    Validation(String),
}

/// Robot parameter record.
///
/// Field order is the storage order of the binary blob and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[repr(C)]
pub struct RobotParams {
    /// Maximum wheel angular speed [rad/s]. Zero keeps the wheels halted.
    pub max_wheel_speed: f64,
    /// Wheel radius [m].
    pub wheel_radius: f64,
    /// Chassis radius — centre to wheel contact point [m].
    pub robot_radius: f64,
    /// Proportional gain of the per-wheel PID.
    pub kp: f64,
    /// Integral gain of the per-wheel PID.
    pub ki: f64,
    /// Derivative gain of the per-wheel PID.
    pub kd: f64,
    /// Braking-space friction coefficient, FORWARD axis.
    pub friction_forward: f64,
    /// Braking-space friction coefficient, STRAFE axis.
    pub friction_strafe: f64,
    /// Braking-space friction coefficient, THETA axis.
    pub friction_theta: f64,
}

impl Default for RobotParams {
    fn default() -> Self {
        Self {
            max_wheel_speed: 10.0,
            wheel_radius: 0.05,
            robot_radius: 0.15,
            kp: 1.4,
            ki: 0.5,
            kd: 0.8,
            friction_forward: 0.0,
            friction_strafe: 0.0,
            friction_theta: 0.0,
        }
    }
}

impl RobotParams {
    /// Decode the packed binary blob (nine little-endian f64, field order).
    pub fn from_bytes(blob: &[u8]) -> Result<Self, ParamsError> {
        if blob.len() != PARAMS_BLOB_LEN {
            return Err(ParamsError::BlobLength { got: blob.len() });
        }

        let mut fields = [0.0_f64; 9];
        for (i, chunk) in blob.chunks_exact(size_of::<f64>()).enumerate() {
            // chunks_exact guarantees 8-byte chunks.
            fields[i] = f64::from_le_bytes(chunk.try_into().unwrap());
        }

        let params = Self {
            max_wheel_speed: fields[0],
            wheel_radius: fields[1],
            robot_radius: fields[2],
            kp: fields[3],
            ki: fields[4],
            kd: fields[5],
            friction_forward: fields[6],
            friction_strafe: fields[7],
            friction_theta: fields[8],
        };
        params.validate()?;
        Ok(params)
    }

    /// Encode into the packed binary blob.
    pub fn to_bytes(&self) -> [u8; PARAMS_BLOB_LEN] {
        let fields = [
            self.max_wheel_speed,
            self.wheel_radius,
            self.robot_radius,
            self.kp,
            self.ki,
            self.kd,
            self.friction_forward,
            self.friction_strafe,
            self.friction_theta,
        ];
        let mut blob = [0_u8; PARAMS_BLOB_LEN];
        for (i, field) in fields.iter().enumerate() {
            let offset = i * size_of::<f64>();
            blob[offset..offset + size_of::<f64>()].copy_from_slice(&field.to_le_bytes());
        }
        blob
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self, ParamsError> {
        let params: Self =
            toml::from_str(toml).map_err(|e| ParamsError::Parse(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Load and validate a TOML parameter file.
    pub fn load(path: &Path) -> Result<Self, ParamsError> {
        let toml = std::fs::read_to_string(path).map_err(|e| ParamsError::Io {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        Self::from_toml_str(&toml)
    }

    /// Validate parameter bounds.
    ///
    /// Radii must be strictly positive (both divide the kinematic
    /// transforms); the maximum wheel speed and the friction coefficients
    /// must be non-negative; every field must be finite.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let named = [
            ("max_wheel_speed", self.max_wheel_speed),
            ("wheel_radius", self.wheel_radius),
            ("robot_radius", self.robot_radius),
            ("kp", self.kp),
            ("ki", self.ki),
            ("kd", self.kd),
            ("friction_forward", self.friction_forward),
            ("friction_strafe", self.friction_strafe),
            ("friction_theta", self.friction_theta),
        ];
        for (name, value) in named {
            if !value.is_finite() {
                return Err(ParamsError::Validation(format!("{name} is not finite")));
            }
        }
        if self.wheel_radius <= 0.0 {
            return Err(ParamsError::Validation(format!(
                "wheel_radius must be > 0, got {}",
                self.wheel_radius
            )));
        }
        if self.robot_radius <= 0.0 {
            return Err(ParamsError::Validation(format!(
                "robot_radius must be > 0, got {}",
                self.robot_radius
            )));
        }
        if self.max_wheel_speed < 0.0 {
            return Err(ParamsError::Validation(format!(
                "max_wheel_speed must be >= 0, got {}",
                self.max_wheel_speed
            )));
        }
        for (name, value) in [
            ("friction_forward", self.friction_forward),
            ("friction_strafe", self.friction_strafe),
            ("friction_theta", self.friction_theta),
        ] {
            if value < 0.0 {
                return Err(ParamsError::Validation(format!(
                    "{name} must be >= 0, got {value}"
                )));
            }
        }
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
