//! Error types for focuser-core.
//!
//! Errors only surface at the edges of the crate: loading or validating a
//! build, and bringing up the hardware. Once the engine is running, faults are
//! handled inside the state machine and never returned from a tick.

use core::fmt;

use crate::hardware::{Pin, PinIoMode};

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all focuser-core operations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Build configuration parsing or validation error
    Config(ConfigError),
    /// Pin or I/O port error
    Hardware(HardwareError),
}

/// Build configuration errors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// A timing parameter that must be positive was zero
    ZeroTiming(&'static str),
    /// Maximum absolute position must be > 0
    InvalidMaxPosition(i32),
    /// Configuration names neither a preset nor a complete parameter set
    MissingField(&'static str),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Hardware I/O errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HardwareError {
    /// Pin operation failed in the underlying HAL
    PinError(Pin),
    /// Pin cannot be configured in the requested mode
    UnsupportedMode {
        /// Pin being configured
        pin: Pin,
        /// Requested mode
        mode: PinIoMode,
    },
    /// Pin is not readable (only HOME is an input)
    NotReadable(Pin),
    /// Pin state does not belong to the pin it was written to
    InvalidPinState(Pin),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Hardware(e) => write!(f, "Hardware error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::ZeroTiming(field) => write!(f, "Timing parameter '{}' must be > 0", field),
            ConfigError::InvalidMaxPosition(v) => {
                write!(f, "Invalid max absolute position: {}. Must be > 0", v)
            }
            ConfigError::MissingField(field) => {
                write!(f, "Missing '{}' and no preset to take it from", field)
            }
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardwareError::PinError(pin) => write!(f, "GPIO operation on {:?} failed", pin),
            HardwareError::UnsupportedMode { pin, mode } => {
                write!(f, "{:?} cannot be used as {:?}", pin, mode)
            }
            HardwareError::NotReadable(pin) => write!(f, "{:?} is not an input", pin),
            HardwareError::InvalidPinState(pin) => write!(f, "Invalid state written to {:?}", pin),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<HardwareError> for Error {
    fn from(e: HardwareError) -> Self {
        Error::Hardware(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for HardwareError {}
