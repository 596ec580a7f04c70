//! Configuration module for focuser-core.
//!
//! Provides the per-build timing and capability parameters, the named build
//! presets, and (with the `std` feature) loading a build from a TOML file.

mod build;
#[cfg(feature = "std")]
mod loader;
mod timing;
mod validation;

pub use build::{Build, BuildParameters, UnknownBuild};
pub use timing::TimingParameters;
pub use validation::validate_build;

pub(crate) use timing::ms_to_next_epoch;

#[cfg(feature = "std")]
pub use loader::{load_build, parse_build};
