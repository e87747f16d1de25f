//! The vertical-sync interrupt, delivered at a fixed frame cadence.
use tracing::{event, Level};

use base::TimingConfig;

use super::host::Host;
use super::machine::MachineState;

/// InterruptPacer fires once per group of frames, whatever the
/// machine did during those frames.  When it fires it redraws the
/// display (unless the machine is headless), raises the interrupt
/// vector and wakes the CPU so that it services the interrupt in its
/// next execution slice.
#[derive(Debug, Clone)]
pub struct InterruptPacer {
    frames_per_tick_group: u64,
    vector: u8,
}

impl InterruptPacer {
    pub fn new(config: &TimingConfig, vector: u8) -> InterruptPacer {
        InterruptPacer {
            frames_per_tick_group: u64::from(config.frames_per_tick_group.max(1)),
            vector,
        }
    }

    #[must_use]
    pub fn fires_on(&self, tick_counter: u64) -> bool {
        tick_counter % self.frames_per_tick_group == 0
    }

    /// Called at the end of each frame with the number of frames
    /// completed before this one.  Returns true if the pacer fired.
    pub fn on_frame_complete<H: Host + ?Sized>(
        &self,
        tick_counter: u64,
        machine: &mut MachineState,
        host: &mut H,
    ) -> bool {
        if !self.fires_on(tick_counter) {
            return false;
        }
        if !machine.headless {
            host.redraw(machine);
        }
        machine.raise_interrupt(self.vector);
        if machine.halted {
            event!(Level::TRACE, "waking halted CPU for vsync at tick {tick_counter}");
        }
        machine.halted = false;
        true
    }
}
