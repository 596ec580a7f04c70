//! Engine module for focuser-core.
//!
//! Provides the focuser state machine, its push-down state stack and the
//! elapsed-time clock that the cooperative scheduler relies on.

mod clock;
mod focuser;
mod stack;
mod state;

use core::fmt;

pub use clock::Clock;
pub use focuser::{Focuser, FIRMWARE_VERSION};
pub use stack::{StackFull, StateStack, StateStackEntry, STACK_CAPACITY};
pub use state::{Direction, Fault, MotorState, State, StateArg};

/// Debug sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl fmt::Write for NullSink {
    fn write_str(&mut self, _s: &str) -> fmt::Result {
        Ok(())
    }
}
