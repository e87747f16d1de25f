//! Access to the host's notion of time.
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tracing::{event, Level};

/// HostClock supplies the two kinds of host time the loop needs.
///
/// [`HostClock::ticks_ms`] is a monotonic millisecond counter, used
/// to measure how long frames take.  Its origin is arbitrary.
/// [`HostClock::wall_clock_seconds`] is the time of day (seconds
/// since the Unix epoch) which the emulated real-time clock shows.
///
/// # Examples
///
/// ```
/// use hostloop::{HostClock, ManualClock};
///
/// fn frame_length<C: HostClock>(clk: &C, frame_start: u64) -> u64 {
///     clk.ticks_ms().saturating_sub(frame_start)
/// }
///
/// let mut clk = ManualClock::new(100, 1_700_000_000);
/// clk.advance(16);
/// assert_eq!(frame_length(&clk, 100), 16);
/// ```
pub trait HostClock {
    fn ticks_ms(&self) -> u64;

    fn wall_clock_seconds(&mut self) -> u64;
}

/// SystemClock reads the operating system's clocks.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,

    /// Most recent wall-clock reading.  When the system time appears
    /// to go backward (or is before the epoch) we keep showing this
    /// value rather than failing.
    last_wall_clock: u64,
}

impl SystemClock {
    pub fn new() -> SystemClock {
        SystemClock {
            origin: Instant::now(),
            last_wall_clock: 0,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock for SystemClock {
    fn ticks_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn wall_clock_seconds(&mut self) -> u64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since_epoch) => {
                let now = since_epoch.as_secs();
                if now < self.last_wall_clock {
                    event!(
                        Level::WARN,
                        "System time went backward from {} to {}",
                        self.last_wall_clock,
                        now
                    );
                }
                self.last_wall_clock = now;
                now
            }
            Err(e) => {
                event!(
                    Level::WARN,
                    "System time is before the Unix epoch ({e}), keeping previous RTC value"
                );
                self.last_wall_clock
            }
        }
    }
}

/// ManualClock only moves when its owner moves it.  Hosts which are
/// handed timestamps by their environment (for example a browser's
/// animation-frame callback) use it, and so do tests.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    ticks_ms: u64,
    wall_clock_seconds: u64,
}

impl ManualClock {
    pub fn new(ticks_ms: u64, wall_clock_seconds: u64) -> ManualClock {
        ManualClock {
            ticks_ms,
            wall_clock_seconds,
        }
    }

    /// Sets both readings.  A monotonic reading earlier than the
    /// current one is ignored.
    pub fn set(&mut self, ticks_ms: u64, wall_clock_seconds: u64) {
        if ticks_ms < self.ticks_ms {
            event!(
                Level::WARN,
                "ignoring attempt to move monotonic clock back from {} to {}",
                self.ticks_ms,
                ticks_ms
            );
        } else {
            self.ticks_ms = ticks_ms;
        }
        self.wall_clock_seconds = wall_clock_seconds;
    }

    pub fn advance(&mut self, ms: u64) {
        self.ticks_ms += ms;
    }
}

impl HostClock for ManualClock {
    fn ticks_ms(&self) -> u64 {
        self.ticks_ms
    }

    fn wall_clock_seconds(&mut self) -> u64 {
        self.wall_clock_seconds
    }
}

#[test]
fn test_manual_clock_is_monotonic() {
    let mut clk = ManualClock::new(50, 10);
    clk.set(40, 11);
    assert_eq!(clk.ticks_ms(), 50);
    assert_eq!(clk.wall_clock_seconds(), 11);
    clk.set(60, 12);
    assert_eq!(clk.ticks_ms(), 60);
}

#[test]
fn test_system_clock_moves_forward() {
    let mut clk = SystemClock::new();
    let first = clk.ticks_ms();
    assert!(clk.ticks_ms() >= first);
    assert!(clk.wall_clock_seconds() > 0);
}
