//! Build configuration loading from files (std only).
//!
//! A build file either names a preset and overrides some of its fields, or
//! spells out every parameter:
//!
//! ```toml
//! preset = "low_power_hyperstar"
//! max_absolute_position = 30000
//!
//! [timing]
//! inactivity_to_sleep_ms = 60000
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, Error, Result};

use super::{Build, BuildParameters, TimingParameters};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct BuildFile {
    #[serde(default)]
    preset: Option<Build>,
    #[serde(default)]
    focuser_has_home: Option<bool>,
    #[serde(default)]
    max_absolute_position: Option<i32>,
    #[serde(default)]
    timing: TimingOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimingOverrides {
    command_poll_interval_ms: Option<u32>,
    max_steps_between_command_checks: Option<u32>,
    inactivity_to_sleep_ms: Option<u32>,
    sleep_poll_interval_ms: Option<u32>,
    motor_power_up_ms: Option<u32>,
}

fn pick<T: Copy>(value: Option<T>, base: Option<T>, field: &'static str) -> Result<T> {
    value
        .or(base)
        .ok_or(Error::Config(ConfigError::MissingField(field)))
}

impl BuildFile {
    fn resolve(self) -> Result<BuildParameters> {
        let base = self.preset.map(Build::params);
        let base_timing = base.map(|b| b.timing);
        let t = self.timing;

        let timing = TimingParameters {
            command_poll_interval_ms: pick(
                t.command_poll_interval_ms,
                base_timing.map(|b| b.command_poll_interval_ms),
                "command_poll_interval_ms",
            )?,
            max_steps_between_command_checks: pick(
                t.max_steps_between_command_checks,
                base_timing.map(|b| b.max_steps_between_command_checks),
                "max_steps_between_command_checks",
            )?,
            inactivity_to_sleep_ms: pick(
                t.inactivity_to_sleep_ms,
                base_timing.map(|b| b.inactivity_to_sleep_ms),
                "inactivity_to_sleep_ms",
            )?,
            sleep_poll_interval_ms: pick(
                t.sleep_poll_interval_ms,
                base_timing.map(|b| b.sleep_poll_interval_ms),
                "sleep_poll_interval_ms",
            )?,
            motor_power_up_ms: pick(
                t.motor_power_up_ms,
                base_timing.map(|b| b.motor_power_up_ms),
                "motor_power_up_ms",
            )?,
        };

        Ok(BuildParameters {
            timing,
            focuser_has_home: pick(
                self.focuser_has_home,
                base.map(|b| b.focuser_has_home),
                "focuser_has_home",
            )?,
            max_absolute_position: pick(
                self.max_absolute_position,
                base.map(|b| b.max_absolute_position),
                "max_absolute_position",
            )?,
        })
    }
}

/// Load build parameters from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or fails validation.
///
/// # Example
///
/// ```rust,ignore
/// use focuser_core::load_build;
///
/// let params = load_build("focuser.toml")?;
/// ```
pub fn load_build<P: AsRef<Path>>(path: P) -> Result<BuildParameters> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| {
        let msg = heapless::String::try_from(e.to_string().as_str()).unwrap_or_default();
        Error::Config(ConfigError::IoError(msg))
    })?;

    parse_build(&content)
}

/// Parse build parameters from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid, a field is missing without a
/// preset to supply it, or the result fails validation.
pub fn parse_build(content: &str) -> Result<BuildParameters> {
    let file: BuildFile = toml::from_str(content).map_err(|e| {
        let msg = heapless::String::try_from(e.message()).unwrap_or_default();
        Error::Config(ConfigError::ParseError(msg))
    })?;

    let params = file.resolve()?;
    super::validation::validate_build(&params)?;

    Ok(params)
}
