//! The `base` crate defines the things which are shared between the
//! host loop library and the programs which host it (the command-line
//! emulator and the browser build).  The idea is that a host which
//! only needs to describe timing or report faults can depend on this
//! crate without pulling in the loop itself.

mod fault;
mod timing;

pub mod prelude;

pub use fault::Fault;
pub use timing::{
    ConfigError, TimingConfig, AUTOADJUST_HEADROOM, AUTOADJUST_TOLERANCE,
    DEFAULT_TARGET_CLOCK_HZ, FRAMES_PER_TICK_GROUP, TICKS_PER_SECOND, VSYNC_INTERRUPT_VECTOR,
};
