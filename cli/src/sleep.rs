use std::thread::sleep;
use std::time::{Duration, Instant};

use tracing::{event, Level};

use hostloop::Sleeper;

/// FrameSleeper waits out the remainder of each frame on the calling
/// thread, and keeps track of how well the operating system honours
/// those waits.
///
/// # Examples
/// ```ignore
/// use std::time::Duration;
/// use hostloop::Sleeper;
/// let mut s = FrameSleeper::new();
/// s.sleep(Duration::from_millis(10));
/// ```
#[derive(Debug, Default)]
pub struct FrameSleeper {
    total_requested: Duration,

    total_cumulative_sleep: Duration,

    /// Number of waits which took more than a millisecond longer than
    /// requested.
    oversleeps: u64,
}

impl FrameSleeper {
    pub fn new() -> FrameSleeper {
        FrameSleeper::default()
    }
}

impl Sleeper for FrameSleeper {
    fn sleep(&mut self, duration: Duration) {
        let then = Instant::now();
        event!(Level::TRACE, "Sleeping for {:?}...", duration);
        sleep(duration);
        let slept_for = then.elapsed();
        self.total_requested += duration;
        self.total_cumulative_sleep += slept_for;
        if slept_for > duration + Duration::from_millis(1) {
            self.oversleeps += 1;
            event!(
                Level::TRACE,
                "FrameSleeper: asked to sleep for {:?}, actually slept for {:?}",
                duration,
                slept_for
            );
        }
    }
}

impl Drop for FrameSleeper {
    fn drop(&mut self) {
        event!(
            Level::INFO,
            "FrameSleeper: drop: total cumulative sleep is {:?} ({:?} requested, {} oversleeps)",
            self.total_cumulative_sleep,
            self.total_requested,
            self.oversleeps
        );
    }
}

#[test]
fn test_sleeper_accounts_for_requested_time() {
    let mut s = FrameSleeper::new();
    s.sleep(Duration::from_millis(2));
    s.sleep(Duration::from_millis(3));
    assert_eq!(s.total_requested, Duration::from_millis(5));
    assert!(s.total_cumulative_sleep >= Duration::from_millis(5));
}
