//! Build parameter validation.

use crate::error::{ConfigError, Error, Result};

use super::BuildParameters;

/// Validate build parameters.
///
/// Checks:
/// - Every timing interval and the step batch size are positive (they are
///   used as divisors for epoch alignment and homing checks)
/// - The maximum absolute position is positive
pub fn validate_build(params: &BuildParameters) -> Result<()> {
    let timing = &params.timing;

    let fields = [
        ("command_poll_interval_ms", timing.command_poll_interval_ms),
        ("max_steps_between_command_checks", timing.max_steps_between_command_checks),
        ("inactivity_to_sleep_ms", timing.inactivity_to_sleep_ms),
        ("sleep_poll_interval_ms", timing.sleep_poll_interval_ms),
    ];

    if let Some((name, _)) = fields.into_iter().find(|(_, value)| *value == 0) {
        return Err(Error::Config(ConfigError::ZeroTiming(name)));
    }

    if params.max_absolute_position <= 0 {
        return Err(Error::Config(ConfigError::InvalidMaxPosition(
            params.max_absolute_position,
        )));
    }

    Ok(())
}
