use std::fmt;

use h8sim_core::register::Reg32;

use crate::isa::Size;

pub const NUM_REGISTERS: usize = 8;

/// Index of the general register that doubles as the stack pointer.
pub const SP_INDEX: u8 = 7;

/// One of the five ways of looking at a general register.
///
/// `Er` is the whole 32 bits, `R` and `E` the low and high halves, `Rl` and
/// `Rh` the low and high bytes of `R`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegisterView {
    Er(u8),
    R(u8),
    E(u8),
    Rh(u8),
    Rl(u8),
}

impl RegisterView {
    /// Decodes a 4-bit byte-register field: bit 3 picks RnL over RnH.
    pub fn byte(field: u8) -> Self {
        let index = field & 0x7;
        if field & 0x8 != 0 {
            RegisterView::Rl(index)
        } else {
            RegisterView::Rh(index)
        }
    }

    /// Decodes a 4-bit word-register field: bit 3 picks En over Rn.
    pub fn word(field: u8) -> Self {
        let index = field & 0x7;
        if field & 0x8 != 0 {
            RegisterView::E(index)
        } else {
            RegisterView::R(index)
        }
    }

    /// Decodes a long-register field; bit 3 is ignored.
    pub fn long(field: u8) -> Self {
        RegisterView::Er(field & 0x7)
    }

    pub fn sized(size: Size, field: u8) -> Self {
        match size {
            Size::Byte => Self::byte(field),
            Size::Word => Self::word(field),
            Size::Long => Self::long(field),
        }
    }

    pub fn index(&self) -> u8 {
        match *self {
            RegisterView::Er(index)
            | RegisterView::R(index)
            | RegisterView::E(index)
            | RegisterView::Rh(index)
            | RegisterView::Rl(index) => index,
        }
    }

    pub fn size(&self) -> Size {
        match self {
            RegisterView::Er(_) => Size::Long,
            RegisterView::R(_) | RegisterView::E(_) => Size::Word,
            RegisterView::Rh(_) | RegisterView::Rl(_) => Size::Byte,
        }
    }

    /// Bit offset and width of the view inside its 32-bit cell.
    fn placement(&self) -> (u32, u32) {
        match self {
            RegisterView::Er(_) => (0, 32),
            RegisterView::R(_) => (0, 16),
            RegisterView::E(_) => (16, 16),
            RegisterView::Rh(_) => (8, 8),
            RegisterView::Rl(_) => (0, 8),
        }
    }
}

impl fmt::Display for RegisterView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterView::Er(n) => write!(f, "ER{}", n),
            RegisterView::R(n) => write!(f, "R{}", n),
            RegisterView::E(n) => write!(f, "E{}", n),
            RegisterView::Rh(n) => write!(f, "R{}H", n),
            RegisterView::Rl(n) => write!(f, "R{}L", n),
        }
    }
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct RegisterFile {
    cells: [Reg32; NUM_REGISTERS],
}

impl fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for cell in &self.cells {
            list.entry(cell);
        }
        list.finish()
    }
}

impl RegisterFile {
    pub fn new() -> Self {
        Default::default()
    }

    fn cell(&self, index: u8) -> &Reg32 {
        &self.cells[usize::from(index & 0x7)]
    }

    fn cell_mut(&mut self, index: u8) -> &mut Reg32 {
        &mut self.cells[usize::from(index & 0x7)]
    }

    pub fn get(&self, view: RegisterView) -> u32 {
        let (shift, width) = view.placement();
        self.cell(view.index()).field(shift, width)
    }

    /// Writes through `view`; bits of `value` wider than the view are dropped.
    pub fn set(&mut self, view: RegisterView, value: u32) {
        let (shift, width) = view.placement();
        self.cell_mut(view.index()).set_field(shift, width, value);
    }

    pub fn er(&self, index: u8) -> u32 {
        self.get(RegisterView::Er(index))
    }

    pub fn set_er(&mut self, index: u8, value: u32) {
        self.set(RegisterView::Er(index), value);
    }

    pub fn r(&self, index: u8) -> u16 {
        self.get(RegisterView::R(index)) as u16
    }

    pub fn set_r(&mut self, index: u8, value: u16) {
        self.set(RegisterView::R(index), value.into());
    }

    pub fn e(&self, index: u8) -> u16 {
        self.get(RegisterView::E(index)) as u16
    }

    pub fn set_e(&mut self, index: u8, value: u16) {
        self.set(RegisterView::E(index), value.into());
    }

    pub fn rh(&self, index: u8) -> u8 {
        self.get(RegisterView::Rh(index)) as u8
    }

    pub fn set_rh(&mut self, index: u8, value: u8) {
        self.set(RegisterView::Rh(index), value.into());
    }

    pub fn rl(&self, index: u8) -> u8 {
        self.get(RegisterView::Rl(index)) as u8
    }

    pub fn set_rl(&mut self, index: u8, value: u8) {
        self.set(RegisterView::Rl(index), value.into());
    }

    pub fn sp(&self) -> u32 {
        self.er(SP_INDEX)
    }

    pub fn set_sp(&mut self, value: u32) {
        self.set_er(SP_INDEX, value);
    }

    pub fn snapshot(&self) -> [u32; NUM_REGISTERS] {
        let mut values = [0; NUM_REGISTERS];
        for (value, cell) in values.iter_mut().zip(&self.cells) {
            *value = cell.read();
        }
        values
    }
}
