use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DecodeError {
    #[error("unknown opcode 0x{opcode:04X}")]
    UnknownOpcode { opcode: u16 },
    #[error("unimplemented opcode {mnemonic} (0x{opcode:04X}, {length} bytes)")]
    UnimplementedOpcode {
        mnemonic: &'static str,
        opcode: u16,
        length: usize,
    },
}

impl DecodeError {
    pub fn opcode(&self) -> u16 {
        match self {
            DecodeError::UnknownOpcode { opcode } => *opcode,
            DecodeError::UnimplementedOpcode { opcode, .. } => *opcode,
        }
    }

    /// Number of bytes to skip before decoding again.
    pub fn len_bytes(&self) -> usize {
        match self {
            DecodeError::UnknownOpcode { .. } => 2,
            DecodeError::UnimplementedOpcode { length, .. } => *length,
        }
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;

pub trait Instruction {
    fn len_bytes(&self) -> usize;
}

pub trait DecodeOne {
    type Instruction: Instruction;

    fn decode_one(&self, bytes: &[u8]) -> Result<Self::Instruction>;
}
