use std::fmt;

use num_traits::Unsigned;

/// A single storage cell. Narrower views of a register are carved out of one
/// of these with shifts and masks, never by reinterpreting memory.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Register<T>
where
    T: Unsigned + Copy,
{
    value: T,
}

impl<T: Unsigned + Copy> Register<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn read(&self) -> T {
        self.value
    }

    pub fn write(&mut self, value: T) {
        self.value = value;
    }
}

pub type Reg8 = Register<u8>;
impl fmt::Debug for Reg8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("0x{:02X}", self.value))
    }
}

pub type Reg16 = Register<u16>;
impl fmt::Debug for Reg16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("0x{:04X}", self.value))
    }
}

pub type Reg32 = Register<u32>;
impl fmt::Debug for Reg32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("0x{:08X}", self.value))
    }
}

impl Reg32 {
    /// Reads the `width`-bit field starting at bit `shift`.
    pub fn field(&self, shift: u32, width: u32) -> u32 {
        (self.value >> shift) & Self::mask(width)
    }

    /// Replaces the `width`-bit field starting at bit `shift`, leaving the
    /// other bits alone. Excess high bits of `value` are dropped.
    pub fn set_field(&mut self, shift: u32, width: u32, value: u32) {
        let mask = Self::mask(width) << shift;
        self.value = (self.value & !mask) | ((value << shift) & mask);
    }

    fn mask(width: u32) -> u32 {
        if width >= 32 {
            u32::MAX
        } else {
            (1 << width) - 1
        }
    }
}
