//! The frame loop.
//!
//! Each frame we measure how long it has been since the previous one,
//! work out the cycle budget, and run it one simulated millisecond at
//! a time (updating the real-time clock at the start of each
//! millisecond).  Then the interrupt pacer runs and the host gets a
//! chance to process its events.
//!
//! There are two ways to host the loop.  A program which owns its
//! main thread calls [`FrameLoopDriver::run_blocking`], which waits
//! out the rest of each frame itself.  An environment which owns the
//! scheduling (such as a browser's animation-frame callback) calls
//! [`FrameLoopDriver::step`] once per callback instead.  Both run
//! exactly the same [`FrameLoopDriver::advance_frame`].
use std::time::Duration;

use serde::Serialize;
use tracing::{event, span, Level};

use base::{ConfigError, Fault, TimingConfig, VSYNC_INTERRUPT_VECTOR};

use super::budget::{clamp_dt, BudgetStrategy, CycleAutoAdjuster, CycleBudget, TickScheduler};
use super::clock::HostClock;
use super::dispatch::{FaultRecoveryDispatcher, SliceReport};
use super::engine::ExecutionEngine;
use super::host::Host;
use super::machine::MachineState;
use super::pacer::InterruptPacer;
use super::rtc::{RealTimeClockBridge, UptimeMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BudgetMode {
    Scheduled,
    AutoAdjust,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    pub timing: TimingConfig,
    pub budget: BudgetMode,
    pub uptime: UptimeMode,
}

impl LoopConfig {
    /// Configuration for a host which runs its own blocking loop and
    /// has a millisecond-accurate clock.
    pub fn blocking(timing: TimingConfig) -> LoopConfig {
        LoopConfig {
            timing,
            budget: BudgetMode::Scheduled,
            uptime: UptimeMode::Counted,
        }
    }

    /// Configuration for a host which calls us once per frame from
    /// its own scheduler.  Such hosts only offer coarse timers, so
    /// the budget is always auto-adjusted.
    pub fn single_step(timing: TimingConfig) -> LoopConfig {
        LoopConfig {
            timing,
            budget: BudgetMode::AutoAdjust,
            uptime: UptimeMode::HostMonotonic,
        }
    }
}

/// Frame timing state.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    previous_timestamp: u64,
    tick_counter: u64,
}

impl FrameClock {
    fn new(now: u64) -> FrameClock {
        FrameClock {
            previous_timestamp: now,
            tick_counter: 0,
        }
    }

    /// Starts a frame at `now`, returning the milliseconds elapsed
    /// since the previous frame started (at least 1).
    fn begin_frame(&mut self, now: u64) -> u64 {
        let elapsed = now.saturating_sub(self.previous_timestamp);
        self.previous_timestamp = now;
        clamp_dt(elapsed)
    }

    fn complete_frame(&mut self) {
        self.tick_counter += 1;
    }

    /// Host timestamp at which the current (or most recent) frame
    /// started.
    pub fn frame_started_at(&self) -> u64 {
        self.previous_timestamp
    }

    /// Number of completed frames.
    pub fn tick_counter(&self) -> u64 {
        self.tick_counter
    }
}

/// What happened during one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    /// Frames completed before this one.
    pub tick: u64,
    pub budget: CycleBudget,
    pub executed: u64,
    pub engine_calls: u64,
    pub faults_recovered: u64,
    /// Simulated milliseconds whose budget was dropped because of an
    /// unrecoverable fault.
    pub slices_abandoned: u64,
    pub last_unrecoverable: Option<Fault>,
    /// Whether the interrupt pacer fired at the end of the frame.
    pub vsync: bool,
    /// Whether the loop should stop after this frame.
    pub exit_requested: bool,
}

impl FrameReport {
    fn new(tick: u64, budget: CycleBudget) -> FrameReport {
        FrameReport {
            tick,
            budget,
            executed: 0,
            engine_calls: 0,
            faults_recovered: 0,
            slices_abandoned: 0,
            last_unrecoverable: None,
            vsync: false,
            exit_requested: false,
        }
    }

    fn absorb(&mut self, slice: &SliceReport) {
        self.executed += slice.executed;
        self.engine_calls += u64::from(slice.calls);
        self.faults_recovered += u64::from(slice.recovered);
        if let Some(fault) = slice.abandoned {
            self.slices_abandoned += 1;
            self.last_unrecoverable = Some(fault);
        }
    }
}

/// Something which can block the calling thread.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// FrameLoopDriver owns the machine, the engine and all of the
/// timing state for the lifetime of the emulator.
#[derive(Debug)]
pub struct FrameLoopDriver<E, C> {
    timing: TimingConfig,
    machine: MachineState,
    engine: E,
    clock: C,
    frames: FrameClock,
    strategy: BudgetStrategy,
    rtc_bridge: RealTimeClockBridge,
    dispatcher: FaultRecoveryDispatcher,
    pacer: InterruptPacer,
    quit_requested: bool,
}

impl<E: ExecutionEngine, C: HostClock> FrameLoopDriver<E, C> {
    pub fn new(
        config: LoopConfig,
        machine: MachineState,
        engine: E,
        clock: C,
    ) -> Result<FrameLoopDriver<E, C>, ConfigError> {
        config.timing.validate()?;
        let strategy = match config.budget {
            BudgetMode::Scheduled => BudgetStrategy::Scheduled(TickScheduler::new(&config.timing)),
            BudgetMode::AutoAdjust => {
                BudgetStrategy::AutoAdjust(CycleAutoAdjuster::new(&config.timing))
            }
        };
        event!(
            Level::INFO,
            "frame loop: {} ticks/s, {} Hz target clock, budget mode {:?}, uptime {:?}",
            config.timing.ticks_per_second,
            config.timing.target_clock_hz,
            config.budget,
            config.uptime
        );
        let frames = FrameClock::new(clock.ticks_ms());
        Ok(FrameLoopDriver {
            timing: config.timing,
            machine,
            engine,
            clock,
            frames,
            strategy,
            rtc_bridge: RealTimeClockBridge::new(config.uptime),
            dispatcher: FaultRecoveryDispatcher::new(),
            pacer: InterruptPacer::new(&config.timing, VSYNC_INTERRUPT_VECTOR),
            quit_requested: false,
        })
    }

    /// Creates a driver for a host which calls [`Self::step`] from its
    /// own frame callback.  Auto-adjustment is always enabled.
    pub fn for_external_scheduler(
        timing: TimingConfig,
        machine: MachineState,
        engine: E,
        clock: C,
    ) -> Result<FrameLoopDriver<E, C>, ConfigError> {
        FrameLoopDriver::new(LoopConfig::single_step(timing), machine, engine, clock)
    }

    pub fn machine(&self) -> &MachineState {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut MachineState {
        &mut self.machine
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn frames(&self) -> &FrameClock {
        &self.frames
    }

    pub fn is_auto_adjusting(&self) -> bool {
        self.strategy.is_auto_adjusting()
    }

    /// True once the host asked to quit or a device asked the
    /// emulator to exit.
    pub fn should_exit(&self) -> bool {
        self.quit_requested || self.machine.exit_requested()
    }

    /// Runs one frame.
    pub fn advance_frame<H: Host + ?Sized>(&mut self, host: &mut H) -> FrameReport {
        let tick = self.frames.tick_counter();
        let dt = self.frames.begin_frame(self.clock.ticks_ms());
        let budget = self.strategy.plan(dt);

        let frame_span = span!(Level::TRACE, "frame", tick);
        let _enter = frame_span.enter();
        event!(Level::TRACE, "dt={dt}ms budget={budget:?}");

        let mut report = FrameReport::new(tick, budget);
        for cycles in budget.shares() {
            self.rtc_bridge.update(&mut self.clock, &mut self.machine.rtc);
            let slice = self
                .dispatcher
                .run_millisecond(&mut self.engine, &mut self.machine, cycles);
            report.absorb(&slice);
        }
        if report.slices_abandoned > 0 {
            event!(
                Level::DEBUG,
                "{} of {dt} simulated milliseconds ended in an unrecoverable fault",
                report.slices_abandoned
            );
        }

        report.vsync = self.pacer.on_frame_complete(tick, &mut self.machine, host);

        if host.poll_events(&mut self.machine) {
            event!(Level::INFO, "host asked to quit");
            self.quit_requested = true;
        }
        report.exit_requested = self.should_exit();
        self.frames.complete_frame();
        report
    }

    /// Runs one frame on behalf of an external scheduler.  Returns
    /// `None`, without running anything, once the loop should stop;
    /// the caller should then cancel its callback.
    ///
    /// This works whatever budget mode the driver was built with;
    /// it is [`Self::for_external_scheduler`] which selects
    /// auto-adjustment for such hosts.
    pub fn step<H: Host + ?Sized>(&mut self, host: &mut H) -> Option<FrameReport> {
        if self.should_exit() {
            event!(Level::DEBUG, "exit requested; not running another frame");
            None
        } else {
            Some(self.advance_frame(host))
        }
    }

    /// Runs frames until the host or a device asks to exit, waiting
    /// at the end of each frame until the next one is due.  A frame
    /// which overruns is not compensated for by skipping work.
    /// Returns the number of frames run.
    pub fn run_blocking<H: Host + ?Sized, S: Sleeper + ?Sized>(
        &mut self,
        host: &mut H,
        sleeper: &mut S,
    ) -> u64 {
        let period = self.timing.frame_period_ms();
        while !self.should_exit() {
            self.advance_frame(host);
            if self.should_exit() {
                break;
            }
            let elapsed = self
                .clock
                .ticks_ms()
                .saturating_sub(self.frames.frame_started_at());
            match period.checked_sub(elapsed) {
                Some(delay) if delay > 0 => sleeper.sleep(Duration::from_millis(delay)),
                _ => {
                    event!(
                        Level::TRACE,
                        "time overrun: frame took {elapsed}ms, period is {period}ms"
                    );
                }
            }
        }
        event!(
            Level::INFO,
            "frame loop stopped after {} frames",
            self.frames.tick_counter()
        );
        self.frames.tick_counter()
    }
}
