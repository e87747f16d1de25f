//! Execution faults.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

/// A non-success status reported by an execution engine for a single
/// call.
///
/// Faults are local events: the host loop offers each one to the
/// engine's recovery routine exactly once, and a fault which cannot
/// be recovered only costs the machine the rest of the current
/// simulated millisecond.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize)]
pub enum Fault {
    /// A memory read from an unmapped or protected address.
    ReadFault(u32),
    /// A memory write to an unmapped or protected address.
    WriteFault(u32),
    /// The instruction word does not decode to a known opcode.
    BadOpcode,
    /// The instruction's condition field is invalid.
    BadCondition,
    /// The instruction names a register which does not exist.
    BadRegister,
    /// The instruction's immediate operand is not valid for it.
    BadImmediate,
    DivideByZero,
    /// A read from an I/O port failed.
    IoRead(u32),
    /// A write to an I/O port failed.
    IoWrite(u32),
    /// An interrupt or exception was raised while interrupts were
    /// disabled and there was no way to deliver it.
    NoInterrupts,
    /// The engine has given up; recovery is not possible.
    CantRecover,
    /// A breakpoint instruction handed control to the debugger.
    Debugger,
}

impl Fault {
    /// Short, stable name of the fault kind (used when reporting
    /// faults to hosts which can't carry the Rust type).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Fault::ReadFault(_) => "read-fault",
            Fault::WriteFault(_) => "write-fault",
            Fault::BadOpcode => "bad-opcode",
            Fault::BadCondition => "bad-condition",
            Fault::BadRegister => "bad-register",
            Fault::BadImmediate => "bad-immediate",
            Fault::DivideByZero => "divide-by-zero",
            Fault::IoRead(_) => "io-read",
            Fault::IoWrite(_) => "io-write",
            Fault::NoInterrupts => "no-interrupts",
            Fault::CantRecover => "cant-recover",
            Fault::Debugger => "debugger",
        }
    }
}

impl Display for Fault {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Fault::ReadFault(addr) => write!(f, "page fault during read at {addr:#010x}"),
            Fault::WriteFault(addr) => write!(f, "page fault during write at {addr:#010x}"),
            Fault::BadOpcode => f.write_str("invalid opcode"),
            Fault::BadCondition => f.write_str("invalid condition"),
            Fault::BadRegister => f.write_str("invalid register"),
            Fault::BadImmediate => f.write_str("invalid immediate operand"),
            Fault::DivideByZero => f.write_str("division by zero"),
            Fault::IoRead(port) => write!(f, "io read from port {port:#010x} failed"),
            Fault::IoWrite(port) => write!(f, "io write to port {port:#010x} failed"),
            Fault::NoInterrupts => f.write_str("interrupts are disabled"),
            Fault::CantRecover => f.write_str("cannot recover from previous fault"),
            Fault::Debugger => f.write_str("debugger breakpoint"),
        }
    }
}

impl Error for Fault {}

#[test]
fn test_fault_names_are_distinct() {
    use std::collections::HashSet;
    let all = [
        Fault::ReadFault(0),
        Fault::WriteFault(0),
        Fault::BadOpcode,
        Fault::BadCondition,
        Fault::BadRegister,
        Fault::BadImmediate,
        Fault::DivideByZero,
        Fault::IoRead(0),
        Fault::IoWrite(0),
        Fault::NoInterrupts,
        Fault::CantRecover,
        Fault::Debugger,
    ];
    let names: HashSet<&str> = all.iter().map(Fault::name).collect();
    assert_eq!(names.len(), all.len());
}

#[test]
fn test_fault_display_includes_address() {
    assert_eq!(
        Fault::ReadFault(0xF000_0000).to_string(),
        "page fault during read at 0xf0000000"
    );
    assert_eq!(
        Fault::IoWrite(0x8000_0000).to_string(),
        "io write to port 0x80000000 failed"
    );
}
