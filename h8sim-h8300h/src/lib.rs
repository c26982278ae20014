pub mod addressing;
pub mod cpu;
pub mod decoder;
pub mod flags;
pub mod isa;
pub mod machine;
pub mod registers;
pub mod stack;
pub mod trace;

pub use crate::cpu::{BranchOutcome, ExecuteError, Execution, H8Cpu, MemoryWrite};
pub use crate::decoder::H8Decoder;
pub use crate::flags::{FlagUpdate, Flags};
pub use crate::machine::H8Machine;
pub use crate::registers::{RegisterFile, RegisterView};
pub use crate::trace::{TraceEvent, TraceRecord};
