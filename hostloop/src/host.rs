//! The interface to the environment hosting the emulator (a window,
//! a terminal, a browser page).
use super::machine::MachineState;

pub trait Host {
    /// Presents the machine's display.  Never called for a headless
    /// machine.
    fn redraw(&mut self, machine: &MachineState);

    /// Processes pending input and window events, feeding them to the
    /// machine.  Returns true when the user asked to quit.
    fn poll_events(&mut self, machine: &mut MachineState) -> bool;
}

impl<H: Host + ?Sized> Host for &mut H {
    fn redraw(&mut self, machine: &MachineState) {
        (**self).redraw(machine)
    }

    fn poll_events(&mut self, machine: &mut MachineState) -> bool {
        (**self).poll_events(machine)
    }
}

/// A host with no display and no input.
#[derive(Debug, Default)]
pub struct HeadlessHost;

impl Host for HeadlessHost {
    fn redraw(&mut self, _machine: &MachineState) {}

    fn poll_events(&mut self, _machine: &mut MachineState) -> bool {
        false
    }
}
