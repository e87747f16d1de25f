//! Bridges host time into the emulated real-time clock.
use serde::Serialize;

use super::clock::HostClock;

/// The values the emulated machine reads from its real-time clock.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RtcState {
    /// Seconds since the Unix epoch.
    pub wall_clock_seconds: u64,
    /// Milliseconds since the emulator started.  This is a 32-bit
    /// register on the machine, so it wraps after about 49 days.
    pub monotonic_uptime: u32,
}

/// How the uptime register advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UptimeMode {
    /// One per simulated millisecond.  Correct when every simulated
    /// millisecond corresponds to one elapsed host millisecond.
    Counted,
    /// Copied from the host's monotonic clock.  Used with the
    /// auto-adjuster, where the number of simulated milliseconds per
    /// frame no longer tracks elapsed time.
    HostMonotonic,
}

#[derive(Debug, Clone)]
pub struct RealTimeClockBridge {
    mode: UptimeMode,
}

impl RealTimeClockBridge {
    pub fn new(mode: UptimeMode) -> RealTimeClockBridge {
        RealTimeClockBridge { mode }
    }

    pub fn mode(&self) -> UptimeMode {
        self.mode
    }

    /// Brings `rtc` up to date at the start of a simulated millisecond.
    pub fn update<C: HostClock + ?Sized>(&self, clock: &mut C, rtc: &mut RtcState) {
        rtc.monotonic_uptime = match self.mode {
            UptimeMode::Counted => rtc.monotonic_uptime.wrapping_add(1),
            UptimeMode::HostMonotonic => wrapped_uptime(clock.ticks_ms()),
        };
        // Time of day going backward is the clock's to report.
        rtc.wall_clock_seconds = clock.wall_clock_seconds();
    }
}

/// Reduces a host millisecond count to the 32-bit uptime register,
/// wrapping the same way as [`UptimeMode::Counted`].
fn wrapped_uptime(ticks_ms: u64) -> u32 {
    u32::try_from(ticks_ms % (1 << 32)).unwrap_or(u32::MAX)
}
