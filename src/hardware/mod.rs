//! Hardware I/O port.
//!
//! The focuser drives a stepper driver through three outputs (STEP, DIR and
//! motor enable) and reads a single home switch input. Pins are named rather
//! than numbered and their levels are expressed in a small vocabulary, so the
//! engine never deals with electrical polarity.

mod hal;

pub use hal::{HalHardware, PinPolarity};

use crate::error::HardwareError;

/// Named pins of the focuser I/O port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pin {
    /// Step pulse output.
    Step,
    /// Direction output.
    Direction,
    /// Motor driver enable output.
    MotorEnable,
    /// Home switch input.
    Home,
}

impl Pin {
    /// Every pin, in declaration order.
    pub const ALL: [Pin; 4] = [Pin::Step, Pin::Direction, Pin::MotorEnable, Pin::Home];

    /// The I/O mode this pin is wired for.
    pub const fn io_mode(self) -> PinIoMode {
        match self {
            Pin::Home => PinIoMode::Input,
            _ => PinIoMode::Output,
        }
    }
}

/// Logical pin levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinState {
    /// STEP asserted.
    StepActive,
    /// STEP released.
    StepInactive,
    /// DIR set to move outward.
    DirForward,
    /// DIR set to move toward home.
    DirBackward,
    /// Motor driver powered.
    MotorOn,
    /// Motor driver unpowered.
    MotorOff,
    /// Home switch closed.
    HomeActive,
    /// Home switch open.
    HomeInactive,
}

impl PinState {
    /// The pin this state belongs to.
    pub const fn pin(self) -> Pin {
        match self {
            PinState::StepActive | PinState::StepInactive => Pin::Step,
            PinState::DirForward | PinState::DirBackward => Pin::Direction,
            PinState::MotorOn | PinState::MotorOff => Pin::MotorEnable,
            PinState::HomeActive | PinState::HomeInactive => Pin::Home,
        }
    }

    /// Whether this is the asserted level of its pin.
    pub const fn is_asserted(self) -> bool {
        matches!(
            self,
            PinState::StepActive | PinState::DirForward | PinState::MotorOn | PinState::HomeActive
        )
    }

    /// The asserted or released level of `pin`.
    pub const fn for_pin(pin: Pin, asserted: bool) -> PinState {
        match (pin, asserted) {
            (Pin::Step, true) => PinState::StepActive,
            (Pin::Step, false) => PinState::StepInactive,
            (Pin::Direction, true) => PinState::DirForward,
            (Pin::Direction, false) => PinState::DirBackward,
            (Pin::MotorEnable, true) => PinState::MotorOn,
            (Pin::MotorEnable, false) => PinState::MotorOff,
            (Pin::Home, true) => PinState::HomeActive,
            (Pin::Home, false) => PinState::HomeInactive,
        }
    }
}

/// Pin direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinIoMode {
    /// Pin is read.
    Input,
    /// Pin is driven.
    Output,
}

/// Digital I/O port owned by the focuser engine.
///
/// Implementations are expected to return immediately; the engine runs on a
/// cooperative scheduler and never waits on a pin.
pub trait Hardware {
    /// Configure the mode of a pin.
    fn pin_mode(&mut self, pin: Pin, mode: PinIoMode) -> Result<(), HardwareError>;

    /// Drive an output pin to `state`.
    fn digital_write(&mut self, pin: Pin, state: PinState) -> Result<(), HardwareError>;

    /// Sample a pin.
    fn digital_read(&mut self, pin: Pin) -> Result<PinState, HardwareError>;
}

impl<T: Hardware + ?Sized> Hardware for &mut T {
    fn pin_mode(&mut self, pin: Pin, mode: PinIoMode) -> Result<(), HardwareError> {
        (**self).pin_mode(pin, mode)
    }

    fn digital_write(&mut self, pin: Pin, state: PinState) -> Result<(), HardwareError> {
        (**self).digital_write(pin, state)
    }

    fn digital_read(&mut self, pin: Pin) -> Result<PinState, HardwareError> {
        (**self).digital_read(pin)
    }
}
