//! Computing how many cycles the machine should execute in a frame.
//!
//! A frame nominally lasts `1000 / ticks_per_second` milliseconds,
//! but the host rarely calls us exactly on time.  We therefore look at
//! how many milliseconds (`dt`) really elapsed since the previous
//! frame and split the frame's budget into `dt` slices, one per
//! simulated millisecond.  That way the real-time clock and pending
//! interrupts are updated at millisecond granularity even when we
//! have to catch up after the host was late.
//!
//! [`TickScheduler`] derives the budget directly from `dt`.  Some
//! hosts (browsers in particular) only offer a coarse clock; there,
//! [`CycleAutoAdjuster`] corrects the budget using the rate the loop
//! actually achieved.
use conv::{ConvUtil, RoundToZero};
use serde::Serialize;
use tracing::{event, Level};

use base::TimingConfig;

/// Clamps an elapsed time to the one millisecond minimum a frame is
/// taken to last.  Hosts with a coarse timer can report that no time
/// passed at all.
#[must_use]
pub fn clamp_dt(elapsed_ms: u64) -> u64 {
    elapsed_ms.max(1)
}

/// The cycle budget for one frame.
///
/// The frame is executed as `dt` slices; each gets `cycles_per_ms`
/// cycles and the last also gets `remainder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleBudget {
    pub dt: u64,
    pub cycles_per_ms: u64,
    pub remainder: u64,
}

impl CycleBudget {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.cycles_per_ms * self.dt + self.remainder
    }

    /// Cycles to execute in slice `index` (counting from zero).
    #[must_use]
    pub fn share(&self, index: u64) -> u64 {
        if index + 1 == self.dt {
            self.cycles_per_ms + self.remainder
        } else {
            self.cycles_per_ms
        }
    }

    /// The cycle count of each slice, in order.
    pub fn shares(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.dt).map(move |i| self.share(i))
    }
}

/// Computes the nominal budget from elapsed time and the target
/// clock rate.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    cycles_per_frame: u64,
}

impl TickScheduler {
    pub fn new(config: &TimingConfig) -> TickScheduler {
        TickScheduler {
            cycles_per_frame: config.cycles_per_frame(),
        }
    }

    pub fn cycles_per_frame(&self) -> u64 {
        self.cycles_per_frame
    }

    /// Splits one frame's worth of cycles over `dt` milliseconds.  The
    /// total is always exactly `target_clock_hz / ticks_per_second`.
    pub fn plan(&self, dt: u64) -> CycleBudget {
        let dt = clamp_dt(dt);
        let cycles_per_ms = self.cycles_per_frame / dt;
        CycleBudget {
            dt,
            cycles_per_ms,
            remainder: self.cycles_per_frame - cycles_per_ms * dt,
        }
    }
}

/// Which way the auto-adjuster decided to go for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Adjustment {
    /// The measured rate was close enough to the target; the previous
    /// frame's cycle count was reused.
    Converged,
    /// The loop ran slow; the budget was recomputed from the measured
    /// milliseconds per cycle.
    SlowCorrected,
    /// The loop ran slow but the measured rate was unusable (for
    /// example on the first frame), so the nominal budget was used.
    SlowFallback,
    /// The loop ran fast.  This is left to the frame wait to fix.
    Fast,
}

/// CycleAutoAdjuster corrects the nominal budget using the frame rate
/// the loop actually achieved.
///
/// The correction is deliberately one-sided.  When the loop runs
/// faster than the target frame rate, nothing is changed: the wait at
/// the end of each frame already keeps the loop from running ahead.
/// Only a loop running slowly has its budget recomputed.  Every frame
/// also receives a fixed headroom of extra cycles.  Together these
/// keep the adjuster from hunting back and forth around the target,
/// at the cost of executing slightly more than the nominal budget.
#[derive(Debug, Clone)]
pub struct CycleAutoAdjuster {
    scheduler: TickScheduler,
    ticks_per_second: u32,
    frames_per_tick_group: u32,
    tolerance: u32,
    headroom: u64,
    last_cycle_count: u64,
    last_adjustment: Option<Adjustment>,
}

impl CycleAutoAdjuster {
    pub fn new(config: &TimingConfig) -> CycleAutoAdjuster {
        CycleAutoAdjuster {
            scheduler: TickScheduler::new(config),
            ticks_per_second: config.ticks_per_second,
            frames_per_tick_group: config.frames_per_tick_group,
            tolerance: config.autoadjust_tolerance,
            headroom: config.autoadjust_headroom,
            last_cycle_count: 1,
            last_adjustment: None,
        }
    }

    /// Cycle count carried over from the previous frame.
    pub fn last_cycle_count(&self) -> u64 {
        self.last_cycle_count
    }

    pub fn last_adjustment(&self) -> Option<Adjustment> {
        self.last_adjustment
    }

    /// Frame rate implied by a frame of `dt` milliseconds, or `None`
    /// if the frame was shorter than a tick group (which is too fast
    /// to measure).
    fn measured_ticks_per_second(&self, dt: u64) -> Option<u64> {
        match dt / u64::from(self.frames_per_tick_group) {
            0 => None,
            per_frame => Some(1000 / per_frame),
        }
    }

    fn within_tolerance(&self, measured: u64) -> bool {
        let target = i64::from(self.ticks_per_second);
        let tolerance = i64::from(self.tolerance);
        let measured = i64::try_from(measured).unwrap_or(i64::MAX);
        measured > target - tolerance && measured < target + tolerance
    }

    /// Cycles per millisecond that would have produced one frame per
    /// `1000 / ticks_per_second` milliseconds, given that the previous
    /// frame's `last_cycle_count` cycles took `dt` milliseconds.
    fn corrected_cycles_per_ms(&self, dt: u64) -> Option<u64> {
        // Single precision is enough here; the result is only an
        // estimate which the next frame corrects again.
        let ms_per_cycle = dt as f32 / self.last_cycle_count as f32;
        if !ms_per_cycle.is_normal() {
            return None;
        }
        let ms_per_frame = 1000.0_f32 / self.ticks_per_second as f32;
        (ms_per_frame / ms_per_cycle)
            .approx_as_by::<u64, RoundToZero>()
            .ok()
    }

    pub fn plan(&mut self, dt: u64) -> CycleBudget {
        let nominal = self.scheduler.plan(dt);
        let dt = nominal.dt;
        let measured = self.measured_ticks_per_second(dt);
        let (adjustment, mut budget) = match measured {
            Some(tps) if self.within_tolerance(tps) => (
                Adjustment::Converged,
                CycleBudget {
                    dt,
                    cycles_per_ms: self.last_cycle_count,
                    remainder: 0,
                },
            ),
            Some(tps) if tps < u64::from(self.ticks_per_second) => {
                match self.corrected_cycles_per_ms(dt) {
                    Some(cycles_per_ms) => (
                        Adjustment::SlowCorrected,
                        CycleBudget {
                            dt,
                            cycles_per_ms,
                            remainder: 0,
                        },
                    ),
                    None => (
                        Adjustment::SlowFallback,
                        CycleBudget {
                            remainder: 0,
                            ..nominal
                        },
                    ),
                }
            }
            _ => (Adjustment::Fast, nominal),
        };
        budget.remainder += self.headroom;
        self.last_cycle_count = budget.cycles_per_ms + budget.remainder;
        self.last_adjustment = Some(adjustment);
        event!(
            Level::TRACE,
            "auto-adjust: dt={dt}ms measured_tps={measured:?} adjustment={adjustment:?} budget={budget:?}"
        );
        budget
    }
}

/// The two ways of computing a frame's budget.  A host loop picks one
/// when it starts and keeps it.
#[derive(Debug, Clone)]
pub enum BudgetStrategy {
    Scheduled(TickScheduler),
    AutoAdjust(CycleAutoAdjuster),
}

impl BudgetStrategy {
    pub fn plan(&mut self, dt: u64) -> CycleBudget {
        match self {
            BudgetStrategy::Scheduled(scheduler) => scheduler.plan(dt),
            BudgetStrategy::AutoAdjust(adjuster) => adjuster.plan(dt),
        }
    }

    pub fn is_auto_adjusting(&self) -> bool {
        matches!(self, BudgetStrategy::AutoAdjust(_))
    }
}

#[cfg(test)]
mod tests;
