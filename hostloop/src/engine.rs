//! The interface to the instruction execution engine.
use tracing::{event, Level};

use base::Fault;

use super::machine::MachineState;

/// The result of one call to [`ExecutionEngine::execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Execution {
    /// Cycles the engine actually executed.  This counts even when
    /// the call ended in a fault.
    pub executed: u32,
    pub outcome: Result<(), Fault>,
}

impl Execution {
    #[must_use]
    pub fn completed(executed: u32) -> Execution {
        Execution {
            executed,
            outcome: Ok(()),
        }
    }

    #[must_use]
    pub fn faulted(executed: u32, fault: Fault) -> Execution {
        Execution {
            executed,
            outcome: Err(fault),
        }
    }
}

/// An instruction execution engine.
///
/// The host loop tells the engine how many cycles it may use, and
/// the engine reports how many it used.  Instruction-set semantics,
/// memory and device dispatch all live behind this trait.
pub trait ExecutionEngine {
    /// Runs up to `max_cycles` cycles.  The reported `executed` count
    /// must not exceed `max_cycles`.
    fn execute(&mut self, machine: &mut MachineState, max_cycles: u32) -> Execution;

    /// Tries to clear `fault` so that execution can continue.  On
    /// failure, returns the fault which prevented recovery (which
    /// need not be the one passed in).
    fn recover(&mut self, machine: &mut MachineState, fault: Fault) -> Result<(), Fault>;

    /// Boot image to install in ROM before any user-supplied one.
    fn boot_rom(&self) -> Option<&[u8]> {
        None
    }
}

impl<E: ExecutionEngine + ?Sized> ExecutionEngine for Box<E> {
    fn execute(&mut self, machine: &mut MachineState, max_cycles: u32) -> Execution {
        (**self).execute(machine, max_cycles)
    }

    fn recover(&mut self, machine: &mut MachineState, fault: Fault) -> Result<(), Fault> {
        (**self).recover(machine, fault)
    }

    fn boot_rom(&self) -> Option<&[u8]> {
        (**self).boot_rom()
    }
}

/// IdleEngine stands in for a real instruction engine, so that a
/// host can be run (and its pacing observed) without one.
///
/// Each call accepts any pending interrupts, consumes the whole
/// budget, and leaves the CPU halted until the next interrupt wakes
/// it up.
#[derive(Debug, Default)]
pub struct IdleEngine {
    interrupts_accepted: u64,
    cycles_consumed: u64,
}

impl IdleEngine {
    pub fn new() -> IdleEngine {
        IdleEngine::default()
    }

    pub fn interrupts_accepted(&self) -> u64 {
        self.interrupts_accepted
    }

    pub fn cycles_consumed(&self) -> u64 {
        self.cycles_consumed
    }
}

impl ExecutionEngine for IdleEngine {
    fn execute(&mut self, machine: &mut MachineState, max_cycles: u32) -> Execution {
        while let Some(vector) = machine.take_interrupt() {
            event!(Level::TRACE, "idle engine accepted interrupt {vector:#04x}");
            self.interrupts_accepted += 1;
        }
        machine.halted = true;
        self.cycles_consumed += u64::from(max_cycles);
        Execution::completed(max_cycles)
    }

    fn recover(&mut self, _machine: &mut MachineState, fault: Fault) -> Result<(), Fault> {
        match fault {
            Fault::CantRecover => Err(fault),
            _ => Ok(()),
        }
    }
}
