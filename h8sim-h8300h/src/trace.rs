use std::fmt;

use crate::cpu::{ExecuteError, Execution, MemoryWrite};
use crate::flags::Flags;
use crate::isa::Instruction;
use crate::registers::NUM_REGISTERS;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TraceEvent {
    Executed {
        instruction: Instruction,
        execution: Execution,
    },
    /// Recognized but decode-only.
    Unimplemented { mnemonic: &'static str },
    Unknown,
    Fault {
        instruction: Instruction,
        error: ExecuteError,
    },
}

/// Everything one step did, with the machine state after it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceRecord {
    /// PC the instruction was fetched from.
    pub pc: u16,
    /// First opcode word.
    pub opcode: u16,
    /// Bytes the step consumed.
    pub length: usize,
    pub event: TraceEvent,
    pub registers: [u32; NUM_REGISTERS],
    pub flags: Flags,
}

impl TraceRecord {
    pub fn writes(&self) -> &[MemoryWrite] {
        match &self.event {
            TraceEvent::Executed { execution, .. } => &execution.writes,
            _ => &[],
        }
    }

    pub fn disassembly(&self) -> String {
        match &self.event {
            TraceEvent::Executed { instruction, .. } => instruction.to_string(),
            TraceEvent::Unimplemented { mnemonic } => String::from(*mnemonic),
            TraceEvent::Unknown => format!("??? (0x{:04x})", self.opcode),
            TraceEvent::Fault { instruction, error } => format!("{} ; {}", instruction, error),
        }
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x} - {}", self.pc, self.disassembly())
    }
}
