use num_traits::{FromPrimitive, ToPrimitive, Unsigned};
use std::{fmt, ops};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpcodeError {
    #[error("{0} index {1} out of bounds, must be [0, {2})")]
    IndexOutOfBounds(&'static str, usize, usize),
}

pub type Result<T> = std::result::Result<T, OpcodeError>;

pub trait OpcodeValue:
    Copy
    + fmt::Debug
    + fmt::UpperHex
    + Unsigned
    + ToPrimitive
    + FromPrimitive
    + ops::BitAnd<Self, Output = Self>
    + ops::Shl<usize, Output = Self>
    + ops::Shr<usize, Output = Self>
{
    const MASK_BIT: Self;
    const MASK_BYTE: Self;
    const MASK_NYBBLE: Self;

    const WIDTH_BITS: usize = Self::WIDTH_BYTES * 8;
    const WIDTH_BYTES: usize = std::mem::size_of::<Self>();
    const WIDTH_NYBBLES: usize = Self::WIDTH_BYTES * 2;
}

impl OpcodeValue for u8 {
    const MASK_BIT: Self = 0x01;
    const MASK_BYTE: Self = 0xFF;
    const MASK_NYBBLE: Self = 0x0F;
}
impl OpcodeValue for u16 {
    const MASK_BIT: Self = 0x01;
    const MASK_BYTE: Self = 0xFF;
    const MASK_NYBBLE: Self = 0x0F;
}
impl OpcodeValue for u32 {
    const MASK_BIT: Self = 0x01;
    const MASK_BYTE: Self = 0xFF;
    const MASK_NYBBLE: Self = 0x0F;
}

/// A fixed-width instruction word with indexed access to its fields.
///
/// Indices count from the least-significant end: nybble 0 of `0x6A28` is
/// `0x8`, nybble 3 is `0x6`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Opcode<T: OpcodeValue> {
    value: T,
}

impl<T: OpcodeValue> Opcode<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    fn extract(
        &self,
        idx_type: &'static str,
        idx: usize,
        width: usize,
        mask: T,
        shift: usize,
    ) -> Result<u8> {
        if idx >= width {
            return Err(OpcodeError::IndexOutOfBounds(idx_type, idx, width));
        }
        let mask = mask << shift;
        let result = (self.value & mask) >> shift;
        Ok(result
            .to_u8()
            .expect("masked field always fits in a u8"))
    }

    pub fn value(&self) -> T {
        self.value
    }

    pub fn get_bit(&self, idx: usize) -> u8 {
        self.try_get_bit(idx).unwrap()
    }

    pub fn get_byte(&self, idx: usize) -> u8 {
        self.try_get_byte(idx).unwrap()
    }

    pub fn get_nybble(&self, idx: usize) -> u8 {
        self.try_get_nybble(idx).unwrap()
    }

    pub fn try_get_bit(&self, idx: usize) -> Result<u8> {
        self.extract("bit", idx, T::WIDTH_BITS, T::MASK_BIT, idx)
    }

    pub fn try_get_byte(&self, idx: usize) -> Result<u8> {
        self.extract("byte", idx, T::WIDTH_BYTES, T::MASK_BYTE, idx * 8)
    }

    pub fn try_get_nybble(&self, idx: usize) -> Result<u8> {
        self.extract("nybble", idx, T::WIDTH_NYBBLES, T::MASK_NYBBLE, idx * 4)
    }
}

impl<T: OpcodeValue> fmt::Debug for Opcode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:0width$X}", self.value, width = T::WIDTH_NYBBLES)
    }
}

/// Copies up to `N` bytes from the front of `bytes`; missing bytes read as zero.
fn take_padded<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut buffer = [0; N];
    let len = bytes.len().min(N);
    buffer[..len].copy_from_slice(&bytes[..len]);
    buffer
}

pub type Opcode8 = Opcode<u8>;
impl Opcode<u8> {
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        Self::new(u8::from_be_bytes(take_padded(bytes)))
    }
}

pub type Opcode16 = Opcode<u16>;
impl Opcode<u16> {
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        Self::new(u16::from_be_bytes(take_padded(bytes)))
    }
}

pub type Opcode32 = Opcode<u32>;
impl Opcode<u32> {
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        Self::new(u32::from_be_bytes(take_padded(bytes)))
    }
}
