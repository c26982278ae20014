use h8sim_core::decoder::{DecodeError, DecodeOne, Result};
use h8sim_core::opcode::{Opcode16, Opcode32};

use crate::isa::{Condition, Instruction, Operand, Operation, Size};
use crate::registers::RegisterView;

/// Longest encoding the decoder looks at.
pub const MAX_INSTRUCTION_LEN: usize = 10;

const ADDRESS24_MASK: u32 = 0x00FF_FFFF;

/// Instruction bytes at PC, zero-padded to the longest encoding.
///
/// Fields are named after the bytes they live in: the first word is
/// `aH aL bH bL`, the second `cH cL dH dL`.
struct Fetch {
    bytes: [u8; MAX_INSTRUCTION_LEN],
}

impl Fetch {
    fn new(bytes: &[u8]) -> Self {
        let mut buffer = [0; MAX_INSTRUCTION_LEN];
        let len = bytes.len().min(MAX_INSTRUCTION_LEN);
        buffer[..len].copy_from_slice(&bytes[..len]);
        Self { bytes: buffer }
    }

    fn word(&self, index: usize) -> Opcode16 {
        Opcode16::from_be_bytes(&self.bytes[index * 2..])
    }

    /// Big-endian 32-bit value starting at byte `offset`.
    fn long(&self, offset: usize) -> u32 {
        Opcode32::from_be_bytes(&self.bytes[offset..]).value()
    }

    fn opcode(&self) -> u16 {
        self.word(0).value()
    }

    fn ah(&self) -> u8 {
        self.word(0).get_nybble(3)
    }

    fn al(&self) -> u8 {
        self.word(0).get_nybble(2)
    }

    fn b(&self) -> u8 {
        self.word(0).get_byte(0)
    }

    fn bh(&self) -> u8 {
        self.word(0).get_nybble(1)
    }

    fn bl(&self) -> u8 {
        self.word(0).get_nybble(0)
    }

    fn c(&self) -> u8 {
        self.word(1).get_byte(1)
    }

    fn ch(&self) -> u8 {
        self.word(1).get_nybble(3)
    }

    fn cl(&self) -> u8 {
        self.word(1).get_nybble(2)
    }

    fn dh(&self) -> u8 {
        self.word(1).get_nybble(1)
    }

    fn dl(&self) -> u8 {
        self.word(1).get_nybble(0)
    }
}

fn executable(f: &Fetch, operation: Operation, length: usize) -> Result<Instruction> {
    Ok(Instruction::new(operation, f.opcode(), length))
}

fn unimplemented(f: &Fetch, mnemonic: &'static str, length: usize) -> Result<Instruction> {
    Err(DecodeError::UnimplementedOpcode {
        mnemonic,
        opcode: f.opcode(),
        length,
    })
}

fn unknown(f: &Fetch) -> Result<Instruction> {
    Err(DecodeError::UnknownOpcode {
        opcode: f.opcode(),
    })
}

/// A two-byte stub when `mnemonic` was recognized, unknown otherwise.
fn short_stub(f: &Fetch, mnemonic: Option<&'static str>) -> Result<Instruction> {
    match mnemonic {
        Some(mnemonic) => unimplemented(f, mnemonic, 2),
        None => unknown(f),
    }
}

fn reg(size: Size, field: u8) -> Operand {
    Operand::Register(RegisterView::sized(size, field))
}

/// Register-to-register form with the source in bH and the destination in bL.
fn register_pair(f: &Fetch, size: Size) -> (Operand, Operand) {
    (reg(size, f.bh()), reg(size, f.bl()))
}

/// MOV between the register in `field` and `memory`; `store` writes memory.
fn transfer(
    f: &Fetch,
    size: Size,
    store: bool,
    memory: Operand,
    field: u8,
    length: usize,
) -> Result<Instruction> {
    let register = reg(size, field);
    let (src, dst) = if store {
        (register, memory)
    } else {
        (memory, register)
    };
    executable(f, Operation::Mov { size, src, dst }, length)
}

/// Picks the inverted bit-operation name when bit 7 of its bit-number byte
/// is set.
fn inverted(nybble: u8, plain: &'static str, inverse: &'static str) -> &'static str {
    if nybble & 0x8 != 0 {
        inverse
    } else {
        plain
    }
}

fn shift_pair(bh: u8, logical: &'static str, arithmetic: &'static str) -> Option<&'static str> {
    match bh {
        0x0 | 0x1 | 0x3 => Some(logical),
        0x8 | 0x9 | 0xB => Some(arithmetic),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct H8Decoder {}

impl H8Decoder {
    pub fn new() -> Self {
        Self {}
    }
}

impl DecodeOne for H8Decoder {
    type Instruction = Instruction;

    fn decode_one(&self, bytes: &[u8]) -> Result<Self::Instruction> {
        let f = Fetch::new(bytes);
        match f.ah() {
            0x0 => decode_0x(&f),
            0x1 => decode_1x(&f),
            0x2 | 0x3 => transfer(
                &f,
                Size::Byte,
                f.ah() == 0x3,
                Operand::Absolute8(f.b()),
                f.al(),
                2,
            ),
            0x4 => executable(
                &f,
                Operation::Branch {
                    condition: Condition::from_nybble(f.al()),
                    disp: i16::from(f.b() as i8),
                },
                2,
            ),
            0x5 => decode_5x(&f),
            0x6 => decode_6x(&f),
            0x7 => decode_7x(&f),
            0x8 => executable(
                &f,
                Operation::Add {
                    size: Size::Byte,
                    src: Operand::Immediate(f.b().into()),
                    dst: reg(Size::Byte, f.al()),
                },
                2,
            ),
            0x9 => unimplemented(&f, "ADDX", 2),
            0xA => unimplemented(&f, "CMP.B", 2),
            0xB => unimplemented(&f, "SUBX", 2),
            0xC => unimplemented(&f, "OR.B", 2),
            0xD => unimplemented(&f, "XOR.B", 2),
            0xE => unimplemented(&f, "AND.B", 2),
            _ => executable(
                &f,
                Operation::Mov {
                    size: Size::Byte,
                    src: Operand::Immediate(f.b().into()),
                    dst: reg(Size::Byte, f.al()),
                },
                2,
            ),
        }
    }
}

fn decode_0x(f: &Fetch) -> Result<Instruction> {
    match f.al() {
        0x0 => executable(f, Operation::Nop, 2),
        0x1 => decode_01(f),
        0x2 => unimplemented(f, "STC", 2),
        0x3 => unimplemented(f, "LDC", 2),
        0x4 => unimplemented(f, "ORC", 2),
        0x5 => unimplemented(f, "XORC", 2),
        0x6 => unimplemented(f, "ANDC", 2),
        0x7 => unimplemented(f, "LDC", 2),
        0x8 => {
            let (src, dst) = register_pair(f, Size::Byte);
            executable(f, Operation::Add { size: Size::Byte, src, dst }, 2)
        }
        0x9 => {
            let (src, dst) = register_pair(f, Size::Word);
            executable(f, Operation::Add { size: Size::Word, src, dst }, 2)
        }
        0xA => match f.bh() {
            0x0 => unimplemented(f, "INC", 2),
            0x8..=0xF => {
                let (src, dst) = register_pair(f, Size::Long);
                executable(f, Operation::Add { size: Size::Long, src, dst }, 2)
            }
            _ => unknown(f),
        },
        0xB => match f.bh() {
            0x0 | 0x8 | 0x9 => unimplemented(f, "ADDS", 2),
            0x5 | 0x7 | 0xD | 0xF => unimplemented(f, "INC", 2),
            _ => unknown(f),
        },
        0xC => {
            let (src, dst) = register_pair(f, Size::Byte);
            executable(f, Operation::Mov { size: Size::Byte, src, dst }, 2)
        }
        0xD => {
            let (src, dst) = register_pair(f, Size::Word);
            executable(f, Operation::Mov { size: Size::Word, src, dst }, 2)
        }
        0xE => unimplemented(f, "ADDX", 2),
        _ => match f.bh() {
            0x0 => unimplemented(f, "DAA", 2),
            0x8..=0xF => {
                let (src, dst) = register_pair(f, Size::Long);
                executable(f, Operation::Mov { size: Size::Long, src, dst }, 2)
            }
            _ => unknown(f),
        },
    }
}

/// The `01` prefix: long moves, CCR memory forms and the extended
/// multiply, divide and logic operations.
fn decode_01(f: &Fetch) -> Result<Instruction> {
    if f.bl() != 0x0 {
        return unknown(f);
    }
    match f.bh() {
        0x0 => decode_mov_long(f),
        0x4 => decode_ccr_memory(f),
        0x8 => unimplemented(f, "SLEEP", 2),
        0xC => match f.c() {
            0x50 | 0x52 => unimplemented(f, "MULXS", 4),
            _ => unknown(f),
        },
        0xD => match f.c() {
            0x51 | 0x53 => unimplemented(f, "DIVXS", 4),
            _ => unknown(f),
        },
        0xF => match f.c() {
            0x64 => unimplemented(f, "OR.L", 4),
            0x65 => unimplemented(f, "XOR.L", 4),
            0x66 => unimplemented(f, "AND.L", 4),
            _ => unknown(f),
        },
        _ => unknown(f),
    }
}

/// `01 00 xx`: MOV.L to and from memory. dH bit 3 selects a store, dH bits
/// 0-2 name the pointer register and dL the data register.
fn decode_mov_long(f: &Fetch) -> Result<Instruction> {
    let store = f.dh() & 0x8 != 0;
    let pointer = f.dh() & 0x7;
    match f.c() {
        0x69 => transfer(f, Size::Long, store, Operand::Indirect(pointer), f.dl(), 4),
        0x6B => match f.dh() {
            0x0 | 0x8 => transfer(
                f,
                Size::Long,
                store,
                Operand::Absolute16(f.word(2).value()),
                f.dl(),
                6,
            ),
            0x2 | 0xA => transfer(
                f,
                Size::Long,
                store,
                Operand::Absolute24(f.long(4) & ADDRESS24_MASK),
                f.dl(),
                8,
            ),
            _ => unknown(f),
        },
        0x6D => {
            let memory = if store {
                Operand::PreDecrement(pointer)
            } else {
                Operand::PostIncrement(pointer)
            };
            transfer(f, Size::Long, store, memory, f.dl(), 4)
        }
        0x6F => transfer(
            f,
            Size::Long,
            store,
            Operand::Displacement {
                base: pointer,
                disp: f.word(2).value() as i16,
            },
            f.dl(),
            6,
        ),
        0x78 => unimplemented(f, "MOV.L", 10),
        _ => unknown(f),
    }
}

/// `01 40 xx`: STC/LDC between CCR and memory.
fn decode_ccr_memory(f: &Fetch) -> Result<Instruction> {
    let name = inverted(f.dh(), "LDC", "STC");
    match f.c() {
        0x69 | 0x6D => unimplemented(f, name, 4),
        0x6F => unimplemented(f, name, 6),
        0x6B => match f.dh() {
            0x0 | 0x8 => unimplemented(f, name, 6),
            0x2 | 0xA => unimplemented(f, name, 8),
            _ => unknown(f),
        },
        0x78 => {
            let direction = Opcode16::from_be_bytes(&f.bytes[4..]).get_nybble(1);
            unimplemented(f, inverted(direction, "LDC", "STC"), 10)
        }
        _ => unknown(f),
    }
}

/// Register-form shifts, logic and the remaining arithmetic. Nothing here
/// is executed.
fn decode_1x(f: &Fetch) -> Result<Instruction> {
    let bh = f.bh();
    let name = match f.al() {
        0x0 => shift_pair(bh, "SHLL", "SHAL"),
        0x1 => shift_pair(bh, "SHLR", "SHAR"),
        0x2 => shift_pair(bh, "ROTXL", "ROTL"),
        0x3 => shift_pair(bh, "ROTXR", "ROTR"),
        0x4 => Some("OR.B"),
        0x5 => Some("XOR.B"),
        0x6 => Some("AND.B"),
        0x7 => match bh {
            0x0 | 0x1 | 0x3 => Some("NOT"),
            0x5 | 0x7 => Some("EXTU"),
            0x8 | 0x9 | 0xB => Some("NEG"),
            0xD | 0xF => Some("EXTS"),
            _ => None,
        },
        0x8 => Some("SUB.B"),
        0x9 => Some("SUB.W"),
        0xA => match bh {
            0x0 => Some("DEC"),
            0x8..=0xF => Some("SUB.L"),
            _ => None,
        },
        0xB => match bh {
            0x0 | 0x8 | 0x9 => Some("SUBS"),
            0x5 | 0x7 | 0xD | 0xF => Some("DEC"),
            _ => None,
        },
        0xC => Some("CMP.B"),
        0xD => Some("CMP.W"),
        0xE => Some("SUBX"),
        _ => match bh {
            0x0 => Some("DAS"),
            0x8..=0xF => Some("CMP.L"),
            _ => None,
        },
    };
    short_stub(f, name)
}

/// Control flow, plus the unsigned multiply and divide.
fn decode_5x(f: &Fetch) -> Result<Instruction> {
    match f.al() {
        0x0 | 0x2 => unimplemented(f, "MULXU", 2),
        0x1 | 0x3 => unimplemented(f, "DIVXU", 2),
        0x4 => executable(f, Operation::Rts, 2),
        0x5 => executable(
            f,
            Operation::Bsr {
                disp: i16::from(f.b() as i8),
            },
            2,
        ),
        0x6 => unimplemented(f, "RTE", 2),
        0x7 => unimplemented(f, "TRAPA", 2),
        0x8 if f.bl() == 0x0 => executable(
            f,
            Operation::Branch {
                condition: Condition::from_nybble(f.bh()),
                disp: f.word(1).value() as i16,
            },
            4,
        ),
        0x9 if f.bl() == 0x0 => executable(
            f,
            Operation::Jmp {
                target: Operand::Indirect(f.bh() & 0x7),
            },
            2,
        ),
        0xA => executable(
            f,
            Operation::Jmp {
                target: Operand::Absolute24(f.long(0) & ADDRESS24_MASK),
            },
            4,
        ),
        0xB => unimplemented(f, "JMP", 2),
        0xC if f.b() == 0x00 => executable(
            f,
            Operation::Bsr {
                disp: f.word(1).value() as i16,
            },
            4,
        ),
        0xD if f.bl() == 0x0 => executable(
            f,
            Operation::Jsr {
                target: Operand::Indirect(f.bh() & 0x7),
            },
            2,
        ),
        0xE => executable(
            f,
            Operation::Jsr {
                target: Operand::Absolute24(f.long(0) & ADDRESS24_MASK),
            },
            4,
        ),
        0xF => unimplemented(f, "JSR", 2),
        _ => unknown(f),
    }
}

/// Byte and word moves through memory, and the register bit operations.
/// bH bit 3 selects a store, bH bits 0-2 the pointer register, bL the data
/// register.
fn decode_6x(f: &Fetch) -> Result<Instruction> {
    let store = f.bh() & 0x8 != 0;
    let pointer = f.bh() & 0x7;
    match f.al() {
        0x0 => unimplemented(f, "BSET", 2),
        0x1 => unimplemented(f, "BNOT", 2),
        0x2 => unimplemented(f, "BCLR", 2),
        0x3 => unimplemented(f, "BTST", 2),
        0x4 => unimplemented(f, "OR.W", 2),
        0x5 => unimplemented(f, "XOR.W", 2),
        0x6 => unimplemented(f, "AND.W", 2),
        0x7 => unimplemented(f, inverted(f.bh(), "BST", "BIST"), 2),
        0x8 => transfer(f, Size::Byte, store, Operand::Indirect(pointer), f.bl(), 2),
        0x9 => transfer(f, Size::Word, store, Operand::Indirect(pointer), f.bl(), 2),
        0xA => decode_mov_absolute(f, Size::Byte),
        0xB => decode_mov_absolute(f, Size::Word),
        0xC | 0xD => {
            let size = if f.al() == 0xC { Size::Byte } else { Size::Word };
            let memory = if store {
                Operand::PreDecrement(pointer)
            } else {
                Operand::PostIncrement(pointer)
            };
            transfer(f, size, store, memory, f.bl(), 2)
        }
        _ => {
            let size = if f.al() == 0xE { Size::Byte } else { Size::Word };
            let memory = Operand::Displacement {
                base: pointer,
                disp: f.word(1).value() as i16,
            };
            transfer(f, size, store, memory, f.bl(), 4)
        }
    }
}

/// `6A`/`6B`: byte and word moves with 16- and 24-bit absolute addresses.
fn decode_mov_absolute(f: &Fetch, size: Size) -> Result<Instruction> {
    let store = f.bh() & 0x8 != 0;
    match (f.bh(), size) {
        (0x0 | 0x8, _) => transfer(
            f,
            size,
            store,
            Operand::Absolute16(f.word(1).value()),
            f.bl(),
            4,
        ),
        (0x2 | 0xA, _) => transfer(
            f,
            size,
            store,
            Operand::Absolute24(f.long(2) & ADDRESS24_MASK),
            f.bl(),
            6,
        ),
        (0x4, Size::Byte) => unimplemented(f, "MOVFPE", 4),
        (0xC, Size::Byte) => unimplemented(f, "MOVTPE", 4),
        _ => unknown(f),
    }
}

fn decode_7x(f: &Fetch) -> Result<Instruction> {
    match f.al() {
        0x0 => unimplemented(f, "BSET", 2),
        0x1 => unimplemented(f, "BNOT", 2),
        0x2 => unimplemented(f, "BCLR", 2),
        0x3 => unimplemented(f, "BTST", 2),
        0x4 => unimplemented(f, inverted(f.bh(), "BOR", "BIOR"), 2),
        0x5 => unimplemented(f, inverted(f.bh(), "BXOR", "BIXOR"), 2),
        0x6 => unimplemented(f, inverted(f.bh(), "BAND", "BIAND"), 2),
        0x7 => unimplemented(f, inverted(f.bh(), "BLD", "BILD"), 2),
        0x8 => unimplemented(f, "MOV", 8),
        0x9 => decode_immediate(f, Size::Word),
        0xA => decode_immediate(f, Size::Long),
        0xB => unimplemented(f, "EEPMOV", 4),
        0xC | 0xE => decode_bit_test_memory(f),
        _ => decode_bit_set_memory(f),
    }
}

/// `79`/`7A`: word and long operations with an immediate source. bH picks
/// the operation and bL the destination register.
fn decode_immediate(f: &Fetch, size: Size) -> Result<Instruction> {
    let (value, length) = match size {
        Size::Long => (f.long(2), 6),
        _ => (u32::from(f.word(1).value()), 4),
    };
    let src = Operand::Immediate(value);
    let dst = reg(size, f.bl());
    let long = size == Size::Long;
    match f.bh() {
        0x0 => executable(f, Operation::Mov { size, src, dst }, length),
        0x1 => executable(f, Operation::Add { size, src, dst }, length),
        0x2 => unimplemented(f, if long { "CMP.L" } else { "CMP.W" }, length),
        0x3 => unimplemented(f, if long { "SUB.L" } else { "SUB.W" }, length),
        0x4 => unimplemented(f, if long { "OR.L" } else { "OR.W" }, length),
        0x5 => unimplemented(f, if long { "XOR.L" } else { "XOR.W" }, length),
        0x6 => unimplemented(f, if long { "AND.L" } else { "AND.W" }, length),
        _ => unknown(f),
    }
}

/// `7C`/`7E`: bit tests and loads against memory.
fn decode_bit_test_memory(f: &Fetch) -> Result<Instruction> {
    let name = match (f.ch(), f.cl()) {
        (0x6 | 0x7, 0x3) => Some("BTST"),
        (0x7, 0x4) => Some(inverted(f.dh(), "BOR", "BIOR")),
        (0x7, 0x5) => Some(inverted(f.dh(), "BXOR", "BIXOR")),
        (0x7, 0x6) => Some(inverted(f.dh(), "BAND", "BIAND")),
        (0x7, 0x7) => Some(inverted(f.dh(), "BLD", "BILD")),
        _ => None,
    };
    match name {
        Some(name) => unimplemented(f, name, 4),
        None => unknown(f),
    }
}

/// `7D`/`7F`: bit sets, clears and stores against memory.
fn decode_bit_set_memory(f: &Fetch) -> Result<Instruction> {
    let name = match (f.ch(), f.cl()) {
        (0x6 | 0x7, 0x0) => Some("BSET"),
        (0x6 | 0x7, 0x1) => Some("BNOT"),
        (0x6 | 0x7, 0x2) => Some("BCLR"),
        (0x6, 0x7) => Some(inverted(f.dh(), "BST", "BIST")),
        _ => None,
    };
    match name {
        Some(name) => unimplemented(f, name, 4),
        None => unknown(f),
    }
}
