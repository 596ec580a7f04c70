//! Timing parameters for a focuser build.

use serde::Deserialize;

/// Scheduler timing for one physical build.
///
/// All intervals are in milliseconds. Values are fixed per build and never
/// change while the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingParameters {
    /// Cadence of command checks while idle.
    pub command_poll_interval_ms: u32,

    /// Steps taken between command checks while moving or homing.
    pub max_steps_between_command_checks: u32,

    /// Idle time without an interrupting command before the motor sleeps.
    pub inactivity_to_sleep_ms: u32,

    /// Cadence of command checks while asleep.
    pub sleep_poll_interval_ms: u32,

    /// Time the driver stage needs after power-up before stepping.
    pub motor_power_up_ms: u32,
}

impl TimingParameters {
    /// Create a new set of timing parameters.
    pub const fn new(
        command_poll_interval_ms: u32,
        max_steps_between_command_checks: u32,
        inactivity_to_sleep_ms: u32,
        sleep_poll_interval_ms: u32,
        motor_power_up_ms: u32,
    ) -> Self {
        Self {
            command_poll_interval_ms,
            max_steps_between_command_checks,
            inactivity_to_sleep_ms,
            sleep_poll_interval_ms,
            motor_power_up_ms,
        }
    }

    /// Power-up delay in microseconds.
    #[inline]
    pub const fn motor_power_up_us(&self) -> u32 {
        self.motor_power_up_ms.saturating_mul(1000)
    }
}

/// Milliseconds from `now_ms` until the next multiple of `interval_ms`.
///
/// A time already on a boundary waits a full interval. `interval_ms` must be
/// non-zero, which build validation guarantees.
#[inline]
pub(crate) fn ms_to_next_epoch(now_ms: u64, interval_ms: u32) -> u32 {
    let interval = u64::from(interval_ms);
    // result is in 1..=interval, so it fits back into u32
    (interval - now_ms % interval) as u32
}
