//! Running one simulated millisecond's worth of cycles, recovering
//! from execution faults as we go.
use serde::Serialize;
use tracing::{event, Level};

use base::Fault;

use super::engine::{Execution, ExecutionEngine};
use super::machine::MachineState;

/// What happened while running one simulated millisecond.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SliceReport {
    /// Calls made to the execution engine.
    pub calls: u32,
    /// Cycles the engine reported executing.
    pub executed: u64,
    /// Faults which the engine recovered from.
    pub recovered: u32,
    /// Set when a fault could not be recovered; the rest of the
    /// millisecond's budget was dropped.
    pub abandoned: Option<Fault>,
    /// Set when the engine reported success without making progress.
    pub stalled: bool,
}

#[derive(Debug, Default, Clone)]
pub struct FaultRecoveryDispatcher;

impl FaultRecoveryDispatcher {
    pub fn new() -> FaultRecoveryDispatcher {
        FaultRecoveryDispatcher
    }

    /// Hands `budget` cycles to `engine`, one call at a time.
    ///
    /// Cycles executed by a call count against the budget whether or
    /// not the call faulted.  A faulting call is followed by exactly
    /// one recovery attempt; if that fails, no more calls are made
    /// until the next millisecond.
    pub fn run_millisecond<E: ExecutionEngine + ?Sized>(
        &self,
        engine: &mut E,
        machine: &mut MachineState,
        budget: u64,
    ) -> SliceReport {
        let mut report = SliceReport::default();
        let mut remaining = budget;
        while remaining > 0 {
            let request: u32 = u32::try_from(remaining).unwrap_or(u32::MAX);
            let Execution { executed, outcome } = engine.execute(machine, request);
            report.calls += 1;
            if executed > request {
                event!(
                    Level::WARN,
                    "execution engine reported {executed} cycles executed when only {request} were requested"
                );
            }
            let executed = u64::from(executed.min(request));
            remaining -= executed;
            report.executed += executed;

            match outcome {
                Ok(()) if executed == 0 => {
                    event!(
                        Level::TRACE,
                        "execution engine made no progress with {remaining} cycles left; ending this millisecond"
                    );
                    report.stalled = true;
                    break;
                }
                Ok(()) => (),
                Err(fault) => {
                    if machine.debug {
                        event!(Level::WARN, "execution fault: {fault}");
                    }
                    match engine.recover(machine, fault) {
                        Ok(()) => {
                            report.recovered += 1;
                        }
                        Err(unrecoverable) => {
                            event!(
                                Level::DEBUG,
                                "failed to recover from {fault} ({unrecoverable}); dropping {remaining} cycles"
                            );
                            report.abandoned = Some(unrecoverable);
                            break;
                        }
                    }
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedEngine, Step};

    #[test]
    fn runs_until_budget_is_consumed() {
        let mut engine = ScriptedEngine::new(vec![
            Step::Run(400),
            Step::Run(400),
            Step::Run(200),
        ]);
        let mut machine = MachineState::new();
        let report = FaultRecoveryDispatcher::new().run_millisecond(&mut engine, &mut machine, 1000);
        assert_eq!(report.calls, 3);
        assert_eq!(report.executed, 1000);
        assert_eq!(engine.requests(), &[1000, 600, 200]);
        assert_eq!(report.abandoned, None);
    }

    #[test]
    fn zero_budget_makes_no_calls() {
        let mut engine = ScriptedEngine::new(vec![]);
        let mut machine = MachineState::new();
        let report = FaultRecoveryDispatcher::new().run_millisecond(&mut engine, &mut machine, 0);
        assert_eq!(report, SliceReport::default());
        assert!(engine.requests().is_empty());
    }

    #[test]
    fn recovered_fault_continues_with_remaining_budget() {
        let mut engine = ScriptedEngine::new(vec![
            Step::Fault(300, Fault::DivideByZero, Ok(())),
            Step::Run(700),
        ]);
        let mut machine = MachineState::new();
        let report = FaultRecoveryDispatcher::new().run_millisecond(&mut engine, &mut machine, 1000);
        assert_eq!(report.calls, 2);
        assert_eq!(report.recovered, 1);
        assert_eq!(report.executed, 1000);
        assert_eq!(engine.requests(), &[1000, 700]);
        assert_eq!(engine.recoveries(), &[Fault::DivideByZero]);
    }

    #[test]
    fn unrecoverable_fault_abandons_the_millisecond() {
        let mut engine = ScriptedEngine::new(vec![Step::Fault(
            0,
            Fault::BadOpcode,
            Err(Fault::CantRecover),
        )]);
        let mut machine = MachineState::new();
        let report = FaultRecoveryDispatcher::new().run_millisecond(&mut engine, &mut machine, 5000);
        assert_eq!(report.calls, 1);
        assert_eq!(report.executed, 0);
        assert_eq!(report.abandoned, Some(Fault::CantRecover));
        assert_eq!(engine.recoveries(), &[Fault::BadOpcode]);
    }

    #[test]
    fn partial_progress_before_fault_counts() {
        let mut engine = ScriptedEngine::new(vec![Step::Fault(
            250,
            Fault::ReadFault(0x1000),
            Err(Fault::ReadFault(0x1000)),
        )]);
        let mut machine = MachineState::new();
        let report = FaultRecoveryDispatcher::new().run_millisecond(&mut engine, &mut machine, 1000);
        assert_eq!(report.executed, 250);
        assert_eq!(report.abandoned, Some(Fault::ReadFault(0x1000)));
    }

    #[test]
    fn overreported_progress_is_clamped_to_request() {
        let mut engine = ScriptedEngine::new(vec![Step::Run(5000)]);
        let mut machine = MachineState::new();
        let report = FaultRecoveryDispatcher::new().run_millisecond(&mut engine, &mut machine, 1000);
        assert_eq!(report.calls, 1);
        assert_eq!(report.executed, 1000);
    }

    #[test]
    fn engine_without_progress_ends_the_millisecond() {
        let mut engine = ScriptedEngine::new(vec![Step::Run(0), Step::Run(1000)]);
        let mut machine = MachineState::new();
        let report = FaultRecoveryDispatcher::new().run_millisecond(&mut engine, &mut machine, 1000);
        assert!(report.stalled);
        assert_eq!(report.calls, 1);
    }

    #[test]
    fn debug_flag_does_not_change_control_flow() {
        let script = || {
            vec![
                Step::Fault(10, Fault::IoRead(0x8000_0000), Ok(())),
                Step::Fault(10, Fault::IoWrite(0x8000_0000), Err(Fault::CantRecover)),
            ]
        };
        let mut quiet_engine = ScriptedEngine::new(script());
        let mut quiet = MachineState::new();
        let mut noisy_engine = ScriptedEngine::new(script());
        let mut noisy = MachineState::new();
        noisy.debug = true;
        let dispatcher = FaultRecoveryDispatcher::new();
        assert_eq!(
            dispatcher.run_millisecond(&mut quiet_engine, &mut quiet, 100),
            dispatcher.run_millisecond(&mut noisy_engine, &mut noisy, 100)
        );
    }
}
