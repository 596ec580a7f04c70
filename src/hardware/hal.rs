//! embedded-hal 1.0 implementation of the focuser I/O port.

use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::HardwareError;

use super::{Hardware, Pin, PinIoMode, PinState};

/// Electrical level of an asserted pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinPolarity {
    /// Asserted = high.
    #[default]
    ActiveHigh,
    /// Asserted = low.
    ActiveLow,
}

impl PinPolarity {
    #[inline]
    fn level(self, asserted: bool) -> bool {
        match self {
            PinPolarity::ActiveHigh => asserted,
            PinPolarity::ActiveLow => !asserted,
        }
    }
}

/// Focuser I/O port over embedded-hal pins.
///
/// Generic over:
/// - `STEP`: STEP pin type (must implement `OutputPin`)
/// - `DIR`: DIR pin type (must implement `OutputPin`)
/// - `ENA`: motor enable pin type (must implement `OutputPin`)
/// - `HOME`: home switch pin type (must implement `InputPin`)
///
/// Pin directions are fixed by the HAL types, so [`Hardware::pin_mode`] only
/// checks that the requested mode matches how the pin is wired.
pub struct HalHardware<STEP, DIR, ENA, HOME>
where
    STEP: OutputPin,
    DIR: OutputPin,
    ENA: OutputPin,
    HOME: InputPin,
{
    step_pin: STEP,
    dir_pin: DIR,
    enable_pin: ENA,
    home_pin: HOME,
    step_polarity: PinPolarity,
    dir_polarity: PinPolarity,
    enable_polarity: PinPolarity,
    home_polarity: PinPolarity,
}

impl<STEP, DIR, ENA, HOME> HalHardware<STEP, DIR, ENA, HOME>
where
    STEP: OutputPin,
    DIR: OutputPin,
    ENA: OutputPin,
    HOME: InputPin,
{
    /// Create a port with every pin active-high.
    pub fn new(step_pin: STEP, dir_pin: DIR, enable_pin: ENA, home_pin: HOME) -> Self {
        Self {
            step_pin,
            dir_pin,
            enable_pin,
            home_pin,
            step_polarity: PinPolarity::ActiveHigh,
            dir_polarity: PinPolarity::ActiveHigh,
            enable_polarity: PinPolarity::ActiveHigh,
            home_polarity: PinPolarity::ActiveHigh,
        }
    }

    /// Set the polarity of the STEP pin.
    pub fn step_polarity(mut self, polarity: PinPolarity) -> Self {
        self.step_polarity = polarity;
        self
    }

    /// Set the polarity of the DIR pin (active = forward).
    pub fn dir_polarity(mut self, polarity: PinPolarity) -> Self {
        self.dir_polarity = polarity;
        self
    }

    /// Set the polarity of the motor enable pin.
    ///
    /// Most stepper drivers take an active-low `EN` input.
    pub fn enable_polarity(mut self, polarity: PinPolarity) -> Self {
        self.enable_polarity = polarity;
        self
    }

    /// Set the polarity of the home switch.
    pub fn home_polarity(mut self, polarity: PinPolarity) -> Self {
        self.home_polarity = polarity;
        self
    }

    /// Release the underlying pins.
    pub fn release(self) -> (STEP, DIR, ENA, HOME) {
        (self.step_pin, self.dir_pin, self.enable_pin, self.home_pin)
    }

    fn drive<P: OutputPin>(pin: &mut P, high: bool, name: Pin) -> Result<(), HardwareError> {
        let result = if high { pin.set_high() } else { pin.set_low() };
        result.map_err(|_| HardwareError::PinError(name))
    }
}

impl<STEP, DIR, ENA, HOME> Hardware for HalHardware<STEP, DIR, ENA, HOME>
where
    STEP: OutputPin,
    DIR: OutputPin,
    ENA: OutputPin,
    HOME: InputPin,
{
    fn pin_mode(&mut self, pin: Pin, mode: PinIoMode) -> Result<(), HardwareError> {
        if pin.io_mode() == mode {
            Ok(())
        } else {
            Err(HardwareError::UnsupportedMode { pin, mode })
        }
    }

    fn digital_write(&mut self, pin: Pin, state: PinState) -> Result<(), HardwareError> {
        if state.pin() != pin {
            return Err(HardwareError::InvalidPinState(pin));
        }

        let asserted = state.is_asserted();
        match pin {
            Pin::Step => Self::drive(&mut self.step_pin, self.step_polarity.level(asserted), pin),
            Pin::Direction => Self::drive(&mut self.dir_pin, self.dir_polarity.level(asserted), pin),
            Pin::MotorEnable => {
                Self::drive(&mut self.enable_pin, self.enable_polarity.level(asserted), pin)
            }
            Pin::Home => Err(HardwareError::UnsupportedMode {
                pin,
                mode: PinIoMode::Output,
            }),
        }
    }

    fn digital_read(&mut self, pin: Pin) -> Result<PinState, HardwareError> {
        if pin != Pin::Home {
            return Err(HardwareError::NotReadable(pin));
        }

        let high = self
            .home_pin
            .is_high()
            .map_err(|_| HardwareError::PinError(Pin::Home))?;

        // level(level(x)) == x for either polarity
        let asserted = self.home_polarity.level(high);
        Ok(PinState::for_pin(Pin::Home, asserted))
    }
}
