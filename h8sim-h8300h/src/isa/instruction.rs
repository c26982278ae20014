use std::fmt;

use crate::isa::Operand;

/// Operand width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Size {
    Byte,
    Word,
    Long,
}

impl Size {
    pub fn bits(self) -> u32 {
        self.bytes() * 8
    }

    pub fn bytes(self) -> u32 {
        match self {
            Size::Byte => 1,
            Size::Word => 2,
            Size::Long => 4,
        }
    }

    pub fn mask(self) -> u32 {
        match self {
            Size::Byte => 0xFF,
            Size::Word => 0xFFFF,
            Size::Long => 0xFFFF_FFFF,
        }
    }

    pub fn sign_bit(self) -> u32 {
        1 << (self.bits() - 1)
    }

    /// Mask of the low half, the span whose carry-out is the half-carry.
    pub fn half_mask(self) -> u32 {
        match self {
            Size::Byte => 0xF,
            Size::Word => 0xFF,
            Size::Long => 0xFFFF,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Size::Byte => "B",
            Size::Word => "W",
            Size::Long => "L",
        }
    }
}

/// Branch conditions in encoding order; the discriminant is the condition
/// nybble of Bcc.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Condition {
    Always = 0x0,
    Never = 0x1,
    Higher = 0x2,
    LowerOrSame = 0x3,
    CarryClear = 0x4,
    CarrySet = 0x5,
    NotEqual = 0x6,
    Equal = 0x7,
    OverflowClear = 0x8,
    OverflowSet = 0x9,
    Plus = 0xA,
    Minus = 0xB,
    GreaterOrEqual = 0xC,
    LessThan = 0xD,
    GreaterThan = 0xE,
    LessOrEqual = 0xF,
}

impl Condition {
    pub fn from_nybble(nybble: u8) -> Self {
        match nybble & 0xF {
            0x0 => Condition::Always,
            0x1 => Condition::Never,
            0x2 => Condition::Higher,
            0x3 => Condition::LowerOrSame,
            0x4 => Condition::CarryClear,
            0x5 => Condition::CarrySet,
            0x6 => Condition::NotEqual,
            0x7 => Condition::Equal,
            0x8 => Condition::OverflowClear,
            0x9 => Condition::OverflowSet,
            0xA => Condition::Plus,
            0xB => Condition::Minus,
            0xC => Condition::GreaterOrEqual,
            0xD => Condition::LessThan,
            0xE => Condition::GreaterThan,
            _ => Condition::LessOrEqual,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Condition::Always => "BRA",
            Condition::Never => "BRN",
            Condition::Higher => "BHI",
            Condition::LowerOrSame => "BLS",
            Condition::CarryClear => "BCC",
            Condition::CarrySet => "BCS",
            Condition::NotEqual => "BNE",
            Condition::Equal => "BEQ",
            Condition::OverflowClear => "BVC",
            Condition::OverflowSet => "BVS",
            Condition::Plus => "BPL",
            Condition::Minus => "BMI",
            Condition::GreaterOrEqual => "BGE",
            Condition::LessThan => "BLT",
            Condition::GreaterThan => "BGT",
            Condition::LessOrEqual => "BLE",
        }
    }
}

/// What an executable instruction does. Operands are listed source first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Nop,
    Mov { size: Size, src: Operand, dst: Operand },
    Add { size: Size, src: Operand, dst: Operand },
    /// Bcc; `disp` is relative to the following instruction. BSR uses the
    /// same base.
    Branch { condition: Condition, disp: i16 },
    Bsr { disp: i16 },
    Jmp { target: Operand },
    Jsr { target: Operand },
    Rts,
}

impl Operation {
    pub fn mnemonic(&self) -> String {
        match self {
            Operation::Nop => String::from("NOP"),
            Operation::Mov { size, .. } => format!("MOV.{}", size.suffix()),
            Operation::Add { size, .. } => format!("ADD.{}", size.suffix()),
            Operation::Branch { condition, .. } => String::from(condition.mnemonic()),
            Operation::Bsr { .. } => String::from("BSR"),
            Operation::Jmp { .. } => String::from("JMP"),
            Operation::Jsr { .. } => String::from("JSR"),
            Operation::Rts => String::from("RTS"),
        }
    }
}

/// A decoded instruction: its operation, first opcode word and encoded length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub operation: Operation,
    pub opcode: u16,
    pub length: usize,
}

impl Instruction {
    pub fn new(operation: Operation, opcode: u16, length: usize) -> Self {
        Self {
            operation,
            opcode,
            length,
        }
    }

    pub fn mnemonic(&self) -> String {
        self.operation.mnemonic()
    }

    /// Width of the displacement field for PC-relative forms.
    fn disp_bits(&self) -> u8 {
        if self.length == 2 {
            8
        } else {
            16
        }
    }
}

impl h8sim_core::Instruction for Instruction {
    fn len_bytes(&self) -> usize {
        self.length
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.mnemonic();
        match &self.operation {
            Operation::Nop | Operation::Rts => f.write_str(&mnemonic),
            Operation::Mov { src, dst, .. } | Operation::Add { src, dst, .. } => {
                write!(f, "{} {}, {}", mnemonic, src, dst)
            }
            Operation::Branch { disp, .. } | Operation::Bsr { disp } => {
                write!(f, "{} {}:{}", mnemonic, disp, self.disp_bits())
            }
            Operation::Jmp { target } | Operation::Jsr { target } => {
                write!(f, "{} {}", mnemonic, target)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::RegisterView;

    #[test]
    fn size_geometry() {
        assert_eq!(Size::Byte.bits(), 8);
        assert_eq!(Size::Word.sign_bit(), 0x8000);
        assert_eq!(Size::Long.sign_bit(), 0x8000_0000);
        assert_eq!(Size::Long.mask(), u32::MAX);
        assert_eq!(Size::Word.half_mask(), 0xFF);
        assert_eq!(Size::Long.bytes(), 4);
    }

    #[test]
    fn condition_nybbles_round_trip() {
        for nybble in 0x0..=0xFu8 {
            assert_eq!(Condition::from_nybble(nybble) as u8, nybble);
        }
        assert_eq!(Condition::from_nybble(0x7).mnemonic(), "BEQ");
        assert_eq!(Condition::from_nybble(0xF).mnemonic(), "BLE");
    }

    #[test]
    fn instructions_display_in_assembler_syntax() {
        let mov = Instruction::new(
            Operation::Mov {
                size: Size::Long,
                src: Operand::PostIncrement(7),
                dst: Operand::Register(RegisterView::Er(0)),
            },
            0x0100,
            4,
        );
        assert_eq!(mov.to_string(), "MOV.L @ER7+, ER0");

        let add = Instruction::new(
            Operation::Add {
                size: Size::Byte,
                src: Operand::Immediate(0x10),
                dst: Operand::Register(RegisterView::Rl(1)),
            },
            0x8910,
            2,
        );
        assert_eq!(add.to_string(), "ADD.B #0x10, R1L");

        let bne = Instruction::new(
            Operation::Branch {
                condition: Condition::NotEqual,
                disp: -4,
            },
            0x46FC,
            2,
        );
        assert_eq!(bne.to_string(), "BNE -4:8");

        let bsr = Instruction::new(Operation::Bsr { disp: 0x100 }, 0x5C00, 4);
        assert_eq!(bsr.to_string(), "BSR 256:16");

        let jsr = Instruction::new(
            Operation::Jsr {
                target: Operand::Indirect(2),
            },
            0x5D20,
            2,
        );
        assert_eq!(jsr.to_string(), "JSR @ER2");
        assert_eq!(Instruction::new(Operation::Rts, 0x5470, 2).to_string(), "RTS");
    }
}
