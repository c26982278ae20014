use std::fmt;

use crate::registers::RegisterView;

/// An operand as encoded in the instruction, before any register or memory
/// state is consulted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Rn, En, RnH, RnL or ERn.
    Register(RegisterView),
    /// #xx:8, #xx:16 or #xx:32, never sign-extended.
    Immediate(u32),
    /// @aa:8, the top of the address space.
    Absolute8(u8),
    /// @aa:16
    Absolute16(u16),
    /// @aa:24
    Absolute24(u32),
    /// @ERn
    Indirect(u8),
    /// @(d:16, ERn)
    Displacement { base: u8, disp: i16 },
    /// @ERn+
    PostIncrement(u8),
    /// @-ERn
    PreDecrement(u8),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(view) => write!(f, "{}", view),
            Operand::Immediate(value) => write!(f, "#0x{:X}", value),
            Operand::Absolute8(aa) => write!(f, "@0x{:02X}:8", aa),
            Operand::Absolute16(aa) => write!(f, "@0x{:04X}:16", aa),
            Operand::Absolute24(aa) => write!(f, "@0x{:06X}:24", aa),
            Operand::Indirect(n) => write!(f, "@ER{}", n),
            Operand::Displacement { base, disp } => write!(f, "@({}:16, ER{})", disp, base),
            Operand::PostIncrement(n) => write!(f, "@ER{}+", n),
            Operand::PreDecrement(n) => write!(f, "@-ER{}", n),
        }
    }
}
