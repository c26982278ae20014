pub mod decoder;
pub mod machine;
pub mod memory;
pub mod opcode;
pub mod register;
pub mod trace;

pub use crate::decoder::{DecodeError, DecodeOne, Instruction};
pub use crate::machine::{Machine, MachineError, Result, RunSummary};
pub use crate::memory::{AddressSpace, Memory, MemoryError, MemoryMap, Region};
pub use crate::opcode::{Opcode16, Opcode32, Opcode8};
pub use crate::trace::{NullSink, TraceSink};
