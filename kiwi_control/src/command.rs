//! Byte-framed command dispatch.
//!
//! A command is one byte plus up to `MAX_ARGS` (7) f64 arguments — three
//! bits of the byte encode the argument count. Reading the byte MSB→LSB:
//!
//! - bit 7 set — **movements**: bits 6..3 select the primitive (0..7),
//!   bits 2..0 carry the argument count.
//! - bit 7 clear, bit 6 set — **testers** (no arguments) or **setters**
//!   (with arguments): bits 5..3 select the subtype.
//! - bits 7..6 clear — **functions**: bits 5..3 select the subtype.
//!
//! An unknown subtype or an argument-count mismatch fails without touching
//! any state.

use kiwi_common::frame::{BodyVector, Pose};
use kiwi_hal::clock::Clock;
use kiwi_hal::driver::MotorPins;
use kiwi_hal::encoder::Encoder;
use thiserror::Error;
use tracing::debug;

use crate::movements::{FiniteMovement, IndefiniteMovement, ScheduleError};
use crate::robot::{Robot, RobotError};

/// Rejected commands.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CommandError {
    /// No movement, setter, tester or function under this byte.
    #[error("unknown command byte {0:#010b}")]
    Unknown(u8),

    /// Encoded or supplied argument count does not match the subtype.
    #[error("command {msg:#04x}: expected {expected} arguments, got {got}")]
    ArgCount { msg: u8, expected: usize, got: usize },

    /// An argument violates its documented domain.
    #[error("argument out of range: {0}")]
    ArgRange(f64),

    /// The movement queue rejected the primitive.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// The robot rejected the operation.
    #[error(transparent)]
    Robot(#[from] RobotError),
}

// Movement subtypes (bits 6..3 with bit 7 set).
const MOVE_STOP: u8 = 0;
const MOVE_SPEED: u8 = 1;
const MOVE_NORM_SPEED: u8 = 2;
const MOVE_SPACE_TIME: u8 = 3;
const MOVE_SPACE_SPEED: u8 = 4;
const MOVE_SPACE_NORM_SPEED: u8 = 5;
const MOVE_SPEED_TIME: u8 = 6;
const MOVE_NORM_SPEED_TIME: u8 = 7;

// Setter subtypes (bits 5..3 in the 0b01 category, argsLen > 0).
const SET_MAX_WHEEL_SPEED: u8 = 0;
const SET_WHEEL_RADIUS: u8 = 1;
const SET_ROBOT_RADIUS: u8 = 2;
const SET_PID: u8 = 3;
const SET_FRICTION: u8 = 4;

// Function subtypes (bits 5..3 in the 0b00 category).
const FN_HOME: u8 = 0;
const FN_EMERGENCY_STOP: u8 = 1;

impl<P: MotorPins, E: Encoder, C: Clock> Robot<P, E, C> {
    /// Dispatch one byte-framed command.
    ///
    /// `args` must hold exactly the count encoded in the low three bits of
    /// `msg`; invalid commands return an error without side effects.
    pub fn handle_message(&mut self, msg: u8, args: &[f64]) -> Result<(), CommandError> {
        let args_len = (msg & 0b111) as usize;
        if args.len() != args_len {
            return Err(CommandError::ArgCount {
                msg,
                expected: args_len,
                got: args.len(),
            });
        }
        debug!(msg = %format_args!("{msg:#010b}"), args_len, "dispatching command");

        if msg & 0b1000_0000 != 0 {
            self.dispatch_movement(msg, args)
        } else if msg & 0b0100_0000 != 0 {
            if args_len == 0 {
                // Testers: none implemented on this build.
                Err(CommandError::Unknown(msg))
            } else {
                self.dispatch_setter(msg, args)
            }
        } else {
            self.dispatch_function(msg, args)
        }
    }

    fn dispatch_movement(&mut self, msg: u8, args: &[f64]) -> Result<(), CommandError> {
        let subtype = (msg >> 3) & 0b1111;
        match (subtype, args.len()) {
            (MOVE_STOP, 0) => {
                self.stop();
                Ok(())
            }
            (MOVE_SPEED, 3) => {
                self.set_indefinite(IndefiniteMovement::Speed(BodyVector::new(
                    args[0], args[1], args[2],
                )));
                Ok(())
            }
            (MOVE_NORM_SPEED, 3) => {
                self.set_indefinite(IndefiniteMovement::NormSpeed {
                    planar: args[0],
                    direction: args[1],
                    angular: args[2],
                });
                Ok(())
            }
            (MOVE_SPACE_TIME, 4) => Ok(self.enqueue(FiniteMovement::space_time(
                Pose::new(args[0], args[1], args[2]),
                args[3],
            ))?),
            (MOVE_SPACE_SPEED, 5) => Ok(self.enqueue(FiniteMovement::space_speed(
                Pose::new(args[0], args[1], args[2]),
                args[3],
                args[4],
            ))?),
            (MOVE_SPACE_NORM_SPEED, 5) => {
                for norm in [args[3], args[4]] {
                    if !(0.0..=1.0).contains(&norm) {
                        return Err(CommandError::ArgRange(norm));
                    }
                }
                Ok(self.enqueue(FiniteMovement::space_norm_speed(
                    Pose::new(args[0], args[1], args[2]),
                    args[3],
                    args[4],
                ))?)
            }
            (MOVE_SPEED_TIME, 4) => Ok(self.enqueue(FiniteMovement::speed_time(
                BodyVector::new(args[0], args[1], args[2]),
                args[3],
            ))?),
            (MOVE_NORM_SPEED_TIME, 4) => Ok(self.enqueue(FiniteMovement::norm_speed_time(
                args[0], args[1], args[2], args[3],
            ))?),
            (subtype, got) => {
                let expected = match subtype {
                    MOVE_STOP => 0,
                    MOVE_SPEED | MOVE_NORM_SPEED => 3,
                    MOVE_SPACE_TIME | MOVE_SPEED_TIME | MOVE_NORM_SPEED_TIME => 4,
                    MOVE_SPACE_SPEED | MOVE_SPACE_NORM_SPEED => 5,
                    _ => return Err(CommandError::Unknown(msg)),
                };
                Err(CommandError::ArgCount { msg, expected, got })
            }
        }
    }

    fn dispatch_setter(&mut self, msg: u8, args: &[f64]) -> Result<(), CommandError> {
        let subtype = (msg >> 3) & 0b111;
        match (subtype, args.len()) {
            (SET_MAX_WHEEL_SPEED, 1) => Ok(self.set_max_wheel_speed(args[0])?),
            (SET_WHEEL_RADIUS, 1) => Ok(self.set_wheel_radius(args[0])?),
            (SET_ROBOT_RADIUS, 1) => Ok(self.set_robot_radius(args[0])?),
            (SET_PID, 3) => Ok(self.set_pid_gains(args[0], args[1], args[2])?),
            (SET_FRICTION, 3) => {
                Ok(self.set_friction(BodyVector::new(args[0], args[1], args[2]))?)
            }
            (subtype, got) => {
                let expected = match subtype {
                    SET_MAX_WHEEL_SPEED | SET_WHEEL_RADIUS | SET_ROBOT_RADIUS => 1,
                    SET_PID | SET_FRICTION => 3,
                    _ => return Err(CommandError::Unknown(msg)),
                };
                Err(CommandError::ArgCount { msg, expected, got })
            }
        }
    }

    fn dispatch_function(&mut self, msg: u8, args: &[f64]) -> Result<(), CommandError> {
        let subtype = (msg >> 3) & 0b111;
        match (subtype, args.len()) {
            (FN_HOME, 0) => Ok(self.home()?),
            (FN_EMERGENCY_STOP, 0) => {
                self.emergency_stop();
                Ok(())
            }
            _ => Err(CommandError::Unknown(msg)),
        }
    }
}

/// Compose a command byte from category bits, subtype and argument count.
///
/// Intended for encoders and tests; the dispatcher itself works on raw
/// bytes.
#[inline]
pub const fn message_byte(category: u8, subtype: u8, args_len: u8) -> u8 {
    (category << 6) | ((subtype & 0b111) << 3) | (args_len & 0b111)
}

/// Compose a movement command byte (bit 7 set, 4-bit subtype).
#[inline]
pub const fn movement_byte(subtype: u8, args_len: u8) -> u8 {
    0b1000_0000 | ((subtype & 0b1111) << 3) | (args_len & 0b111)
}

// ─── Tests ──────────────────────────────────────────────────────────
