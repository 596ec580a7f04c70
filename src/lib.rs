//! # focuser-core
//!
//! Control core of a motorized telescope focuser: a cooperative, stack-based
//! state machine that turns text commands into timed stepper pulses.
//!
//! ## Features
//!
//! - **Cooperative**: [`Focuser::tick`] runs one state and returns the
//!   microseconds to wait; the caller owns the sleep
//! - **Interruptible**: long moves and homing sweeps run in bounded batches so
//!   new commands are seen mid-motion
//! - **Power aware**: the motor driver is switched off after a period of
//!   inactivity and powered back up on the next motion command
//! - **no_std compatible**: fixed-capacity stack and line buffers, no allocation
//! - **embedded-hal 1.0**: [`HalHardware`] adapts `OutputPin`/`InputPin`s
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use focuser_core::{Build, Focuser, HalHardware};
//!
//! let hardware = HalHardware::new(step_pin, dir_pin, enable_pin, home_pin);
//! let mut focuser = Focuser::new(link, hardware, debug_uart, Build::LowPowerHyperstar.params())?;
//!
//! loop {
//!     let wait_us = focuser.tick();
//!     delay.delay_us(wait_us);
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): TOML build loading and the [`sim`] collaborators
//! - `defmt`: `defmt::Format` on public types and trace logging via defmt

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
#![allow(clippy::result_large_err)]

mod log;

// Core modules
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod hardware;
#[cfg(feature = "std")]
pub mod sim;

// Re-exports for ergonomic API
pub use command::{Command, CommandPacket, Transport};
pub use config::{validate_build, Build, BuildParameters, TimingParameters};
pub use engine::{Direction, Focuser, MotorState, NullSink, State, StateArg};
pub use error::{Error, Result};
pub use hardware::{HalHardware, Hardware, Pin, PinIoMode, PinState};

// Build loading (std only)
#[cfg(feature = "std")]
pub use config::{load_build, parse_build};
