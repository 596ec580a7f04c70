//! Build parameters and the named build presets.

use core::fmt;
use core::str::FromStr;

use serde::Deserialize;

use super::timing::TimingParameters;

/// Everything that differs between physical focuser builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BuildParameters {
    /// Scheduler timing.
    pub timing: TimingParameters,

    /// Whether a home switch is fitted.
    pub focuser_has_home: bool,

    /// Outermost legal position in steps.
    pub max_absolute_position: i32,
}

impl BuildParameters {
    /// Create build parameters.
    pub const fn new(timing: TimingParameters, focuser_has_home: bool, max_absolute_position: i32) -> Self {
        Self {
            timing,
            focuser_has_home,
            max_absolute_position,
        }
    }

    /// Clamp a requested position into `[0, max_absolute_position]`.
    #[inline]
    pub fn clamp_position(&self, position: i32) -> i32 {
        position.clamp(0, self.max_absolute_position.max(0))
    }
}

/// Named hardware builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Build {
    /// Battery-friendly Hyperstar focuser with a home switch.
    LowPowerHyperstar,
    /// Hyperstar timing shortened for tests.
    UnitTestHyperstar,
    /// Conventional focuser without a home switch.
    Traditional,
    /// Conventional focuser timing shortened for tests.
    UnitTestTraditional,
}

const HYPERSTAR_MAX_POSITION: i32 = 35_000;
// No real end stop on the traditional build; this is a placeholder range
const TRADITIONAL_MAX_POSITION: i32 = 5_000;

const TEST_TIMING: TimingParameters = TimingParameters::new(10, 2, 1000, 500, 200);

impl Build {
    /// Every preset, in declaration order.
    pub const ALL: [Build; 4] = [
        Build::LowPowerHyperstar,
        Build::UnitTestHyperstar,
        Build::Traditional,
        Build::UnitTestTraditional,
    ];

    /// The parameters of this preset.
    pub const fn params(self) -> BuildParameters {
        match self {
            Build::LowPowerHyperstar => BuildParameters::new(
                TimingParameters::new(100, 50, 5 * 60 * 1000, 1000, 1000),
                true,
                HYPERSTAR_MAX_POSITION,
            ),
            Build::UnitTestHyperstar => BuildParameters::new(TEST_TIMING, true, HYPERSTAR_MAX_POSITION),
            Build::Traditional => BuildParameters::new(
                // 10 days, not the 4 h (10 * 24 * 60 * 1000) older firmware computed
                TimingParameters::new(100, 50, 10 * 24 * 60 * 60 * 1000, 1000, 1000),
                false,
                TRADITIONAL_MAX_POSITION,
            ),
            Build::UnitTestTraditional => BuildParameters::new(TEST_TIMING, false, TRADITIONAL_MAX_POSITION),
        }
    }

    /// Configuration name of this preset.
    pub const fn name(self) -> &'static str {
        match self {
            Build::LowPowerHyperstar => "low_power_hyperstar",
            Build::UnitTestHyperstar => "unit_test_hyperstar",
            Build::Traditional => "traditional",
            Build::UnitTestTraditional => "unit_test_traditional",
        }
    }
}

impl From<Build> for BuildParameters {
    fn from(build: Build) -> Self {
        build.params()
    }
}

impl fmt::Display for Build {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a preset name is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownBuild;

impl FromStr for Build {
    type Err = UnknownBuild;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Build::ALL
            .into_iter()
            .find(|build| build.name().eq_ignore_ascii_case(s))
            .ok_or(UnknownBuild)
    }
}
