//! Constants and configuration governing how emulated time is paced
//! against the host's clock.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Number of frames (ticks of the host loop) per wall-clock second.
pub const TICKS_PER_SECOND: u32 = 60;

/// The interrupt pacer fires once in every group of this many ticks.
pub const FRAMES_PER_TICK_GROUP: u32 = 1;

/// Emulated instruction clock rate used when the engine doesn't
/// specify one.
pub const DEFAULT_TARGET_CLOCK_HZ: u64 = 33_000_000;

/// The auto-adjuster considers itself converged while the measured
/// frame rate is strictly within this many ticks per second of
/// [`TICKS_PER_SECOND`].
pub const AUTOADJUST_TOLERANCE: u32 = 10;

/// Extra cycles the auto-adjuster adds to every frame's budget.
pub const AUTOADJUST_HEADROOM: u64 = 1000;

/// Interrupt vector raised once per tick group.
pub const VSYNC_INTERRUPT_VECTOR: u8 = 0xFF;

/// Timing parameters for one host loop.
///
/// # Examples
/// ```
/// use base::TimingConfig;
/// let config = TimingConfig {
///     target_clock_hz: 16_000_000,
///     ..TimingConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// assert_eq!(config.cycles_per_frame(), 266_666);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub ticks_per_second: u32,
    pub frames_per_tick_group: u32,
    pub target_clock_hz: u64,
    pub autoadjust_tolerance: u32,
    pub autoadjust_headroom: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            ticks_per_second: TICKS_PER_SECOND,
            frames_per_tick_group: FRAMES_PER_TICK_GROUP,
            target_clock_hz: DEFAULT_TARGET_CLOCK_HZ,
            autoadjust_tolerance: AUTOADJUST_TOLERANCE,
            autoadjust_headroom: AUTOADJUST_HEADROOM,
        }
    }
}

impl TimingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticks_per_second == 0 {
            Err(ConfigError::ZeroTicksPerSecond)
        } else if self.ticks_per_second > 1000 {
            // A frame shorter than a millisecond has no sub-iterations.
            Err(ConfigError::TicksPerSecondTooHigh(self.ticks_per_second))
        } else if self.frames_per_tick_group == 0 {
            Err(ConfigError::ZeroTickGroup)
        } else if self.target_clock_hz == 0 {
            Err(ConfigError::ZeroClockRate)
        } else {
            Ok(())
        }
    }

    /// Nominal instruction budget of a single frame.
    #[must_use]
    pub fn cycles_per_frame(&self) -> u64 {
        self.target_clock_hz / u64::from(self.ticks_per_second)
    }

    /// Nominal length of a frame, in whole milliseconds.
    #[must_use]
    pub fn frame_period_ms(&self) -> u64 {
        1000 / u64::from(self.ticks_per_second)
    }
}

/// Signals that a [`TimingConfig`] cannot drive a host loop.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    ZeroTicksPerSecond,
    TicksPerSecondTooHigh(u32),
    ZeroTickGroup,
    ZeroClockRate,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            ConfigError::ZeroTicksPerSecond => f.write_str("ticks per second must be non-zero"),
            ConfigError::TicksPerSecondTooHigh(n) => {
                write!(f, "{n} ticks per second is more than one tick per millisecond")
            }
            ConfigError::ZeroTickGroup => f.write_str("frames per tick group must be non-zero"),
            ConfigError::ZeroClockRate => f.write_str("target clock rate must be non-zero"),
        }
    }
}

impl Error for ConfigError {}
