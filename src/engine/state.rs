//! Control states, their stack arguments, and the engine's small enums.

use core::fmt;

use crate::error::HardwareError;

use super::stack::StackFull;

/// Direction of focuser travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Away from home (position increases).
    Forward,
    /// Toward home (position decreases).
    Reverse,
}

impl Direction {
    /// Direction that reduces a signed step delta toward zero.
    #[inline]
    pub fn from_steps(steps: i32) -> Self {
        if steps > 0 {
            Direction::Forward
        } else {
            Direction::Reverse
        }
    }

    /// Position change of one step in this direction.
    #[inline]
    pub fn sign(self) -> i32 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }
}

/// Power state of the stepper driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorState {
    /// Driver enabled and holding.
    On,
    /// Driver disabled.
    Off,
}

/// Internal faults that park the engine in [`State::ErrorState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// A push would exceed the state stack capacity.
    StackOverflow,
    /// A state found an argument of the wrong shape on the stack.
    ArgumentMismatch,
    /// A pin operation failed mid-run.
    Hardware,
    /// Dispatch was asked to run [`Command::NoCommand`](crate::command::Command::NoCommand).
    UnroutableCommand,
}

impl Fault {
    /// Name printed in status and debug output.
    pub const fn name(self) -> &'static str {
        match self {
            Fault::StackOverflow => "STACK_OVERFLOW",
            Fault::ArgumentMismatch => "ARGUMENT_MISMATCH",
            Fault::Hardware => "HARDWARE",
            Fault::UnroutableCommand => "UNROUTABLE_COMMAND",
        }
    }
}

impl From<StackFull> for Fault {
    fn from(_: StackFull) -> Self {
        Fault::StackOverflow
    }
}

impl From<HardwareError> for Fault {
    fn from(_: HardwareError) -> Self {
        Fault::Hardware
    }
}

/// Control states of the focuser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Idle; polls for commands. Floor of the stack.
    AcceptCommands,
    /// Emit a counted run of step pulses.
    DoSteps,
    /// Release STEP and wait.
    StepperInactiveAndWait,
    /// Assert STEP and wait.
    StepperActiveAndWait,
    /// Change the DIR pin if needed.
    SetDirection,
    /// Travel to an absolute target in bounded batches.
    Moving,
    /// Back up one step at a time until the home switch closes.
    StopAtHome,
    /// Motor powered down; slow command polling.
    Sleep,
    /// Internal fault; no way out without a reset.
    ErrorState,
}

impl State {
    /// Every state, in declaration order.
    pub const ALL: [State; 9] = [
        State::AcceptCommands,
        State::DoSteps,
        State::StepperInactiveAndWait,
        State::StepperActiveAndWait,
        State::SetDirection,
        State::Moving,
        State::StopAtHome,
        State::Sleep,
        State::ErrorState,
    ];

    /// Name reported by `mstatus`.
    pub const fn name(self) -> &'static str {
        match self {
            State::AcceptCommands => "ACCEPTING_COMMANDS",
            State::DoSteps => "DO_STEPS",
            State::StepperInactiveAndWait => "STEPPER_INACTIVE",
            State::StepperActiveAndWait => "STEPPER_ACTIVE",
            State::SetDirection => "SET_DIR",
            State::Moving => "MOVING",
            State::StopAtHome => "STOP_AT_HOME",
            State::Sleep => "LOW_POWER",
            State::ErrorState => "ERROR ERROR ERROR",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Argument carried by a stack entry.
///
/// Each state reads only the shape it pushes: step counts and targets are
/// [`StateArg::Count`], direction changes are [`StateArg::Direction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StateArg {
    /// No argument.
    #[default]
    None,
    /// Step count or absolute position.
    Count(i32),
    /// Requested direction.
    Direction(Direction),
    /// Reason the engine faulted.
    Fault(Fault),
}

impl StateArg {
    /// The integer argument, if this is one.
    #[inline]
    pub fn as_count(self) -> Option<i32> {
        match self {
            StateArg::Count(n) => Some(n),
            _ => None,
        }
    }

    /// The direction argument, if this is one.
    #[inline]
    pub fn as_direction(self) -> Option<Direction> {
        match self {
            StateArg::Direction(d) => Some(d),
            _ => None,
        }
    }
}

impl From<i32> for StateArg {
    fn from(n: i32) -> Self {
        StateArg::Count(n)
    }
}

impl From<Direction> for StateArg {
    fn from(d: Direction) -> Self {
        StateArg::Direction(d)
    }
}

impl From<Fault> for StateArg {
    fn from(f: Fault) -> Self {
        StateArg::Fault(f)
    }
}

impl fmt::Display for StateArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateArg::None => f.write_str("0"),
            StateArg::Count(n) => write!(f, "{}", n),
            StateArg::Direction(Direction::Forward) => f.write_str("FORWARD"),
            StateArg::Direction(Direction::Reverse) => f.write_str("REVERSE"),
            StateArg::Fault(fault) => f.write_str(fault.name()),
        }
    }
}
