pub mod instruction;
pub mod operand;

pub use instruction::{Condition, Instruction, Operation, Size};
pub use operand::Operand;
