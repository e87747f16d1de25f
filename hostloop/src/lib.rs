//! This crate is the real-time host loop of the emulator.  It decides
//! how many cycles the machine may execute in each frame, runs them
//! one simulated millisecond at a time while keeping the machine's
//! real-time clock current, recovers from execution faults, and
//! delivers the vertical-sync interrupt at a fixed frame rate.
//!
//! The instruction engine and the host environment (window, terminal
//! or browser page) are supplied by the caller through the
//! [`ExecutionEngine`] and [`Host`] traits.
#![deny(unsafe_code)]

mod budget;
mod clock;
mod dispatch;
mod driver;
mod engine;
mod host;
mod image;
mod machine;
mod pacer;
mod rtc;

#[cfg(test)]
mod testing;

pub use budget::{
    clamp_dt, Adjustment, BudgetStrategy, CycleAutoAdjuster, CycleBudget, TickScheduler,
};
pub use clock::{HostClock, ManualClock, SystemClock};
pub use dispatch::{FaultRecoveryDispatcher, SliceReport};
pub use driver::{BudgetMode, FrameClock, FrameLoopDriver, FrameReport, LoopConfig, Sleeper};
pub use engine::{Execution, ExecutionEngine, IdleEngine};
pub use host::{HeadlessHost, Host};
pub use image::{attach_disk_file, init_machine, install_rom_file, load_image, ImageError};
pub use machine::{DiskImage, ExitRequest, MachineState, REGISTER_COUNT, ROM_SIZE};
pub use pacer::InterruptPacer;
pub use rtc::{RealTimeClockBridge, RtcState, UptimeMode};

pub use base::{ConfigError, Fault, TimingConfig};
