//! Test doubles for the host loop's collaborators.
use base::Fault;

use super::engine::{Execution, ExecutionEngine};
use super::host::Host;
use super::machine::MachineState;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Step {
    /// Report this many cycles executed, successfully.
    Run(u32),
    /// Execute this many cycles, then fault.  The recovery routine
    /// answers with the given result.
    Fault(u32, Fault, Result<(), Fault>),
}

/// An engine which follows a script, then executes every request in
/// full once the script runs out.
#[derive(Debug)]
pub(crate) struct ScriptedEngine {
    script: std::collections::VecDeque<Step>,
    pending_recovery: Option<Result<(), Fault>>,
    requests: Vec<u32>,
    recoveries: Vec<Fault>,
}

impl ScriptedEngine {
    pub(crate) fn new(script: Vec<Step>) -> ScriptedEngine {
        ScriptedEngine {
            script: script.into(),
            pending_recovery: None,
            requests: Vec::new(),
            recoveries: Vec::new(),
        }
    }

    pub(crate) fn requests(&self) -> &[u32] {
        &self.requests
    }

    pub(crate) fn recoveries(&self) -> &[Fault] {
        &self.recoveries
    }
}

impl ExecutionEngine for ScriptedEngine {
    fn execute(&mut self, _machine: &mut MachineState, max_cycles: u32) -> Execution {
        self.requests.push(max_cycles);
        match self.script.pop_front() {
            None => Execution::completed(max_cycles),
            Some(Step::Run(n)) => Execution::completed(n),
            Some(Step::Fault(n, fault, recovery)) => {
                self.pending_recovery = Some(recovery);
                Execution::faulted(n.min(max_cycles), fault)
            }
        }
    }

    fn recover(&mut self, _machine: &mut MachineState, fault: Fault) -> Result<(), Fault> {
        self.recoveries.push(fault);
        self.pending_recovery.take().unwrap_or(Err(Fault::CantRecover))
    }
}

/// An engine whose every call faults without executing anything,
/// and which can never recover.
#[derive(Debug, Default)]
pub(crate) struct BrokenEngine {
    pub(crate) calls: u64,
}

impl ExecutionEngine for BrokenEngine {
    fn execute(&mut self, _machine: &mut MachineState, _max_cycles: u32) -> Execution {
        self.calls += 1;
        Execution::faulted(0, Fault::BadOpcode)
    }

    fn recover(&mut self, _machine: &mut MachineState, _fault: Fault) -> Result<(), Fault> {
        Err(Fault::CantRecover)
    }
}

/// A host which counts what the loop asks of it, and asks to quit
/// after a given number of polls.
#[derive(Debug, Default)]
pub(crate) struct CountingHost {
    pub(crate) redraws: u64,
    pub(crate) polls: u64,
    pub(crate) quit_after_polls: Option<u64>,
}

impl Host for CountingHost {
    fn redraw(&mut self, _machine: &MachineState) {
        self.redraws += 1;
    }

    fn poll_events(&mut self, _machine: &mut MachineState) -> bool {
        self.polls += 1;
        matches!(self.quit_after_polls, Some(n) if self.polls >= n)
    }
}

/// A clock which moves forward by a fixed step every time it is
/// read, as if each reading took that long.
#[derive(Debug, Default)]
pub(crate) struct SteppingClock {
    now: std::cell::Cell<u64>,
    step: u64,
}

impl SteppingClock {
    pub(crate) fn new(step: u64) -> SteppingClock {
        SteppingClock {
            now: std::cell::Cell::new(0),
            step,
        }
    }
}

impl crate::clock::HostClock for SteppingClock {
    fn ticks_ms(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }

    fn wall_clock_seconds(&mut self) -> u64 {
        self.now.get() / 1000
    }
}

/// A sleeper which records what it was asked to do.
#[derive(Debug, Default)]
pub(crate) struct RecordingSleeper {
    pub(crate) sleeps: Vec<std::time::Duration>,
}

impl crate::driver::Sleeper for RecordingSleeper {
    fn sleep(&mut self, duration: std::time::Duration) {
        self.sleeps.push(duration);
    }
}
