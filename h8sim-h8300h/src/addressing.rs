//! Effective-address calculation for every operand mode.

use h8sim_core::Memory;

use crate::cpu::{ExecuteError, Result};
use crate::isa::{Operand, Size};
use crate::registers::{RegisterFile, RegisterView};

/// Page that @aa:8 addresses.
const ABSOLUTE8_BASE: u32 = 0x00FF_FF00;
/// Upper bits that @aa:16 addresses are extended with.
const ABSOLUTE16_BASE: u32 = 0x00FF_0000;
const ABSOLUTE24_MASK: u32 = 0x00FF_FFFF;

/// An operand after its addressing mode has been applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resolved {
    Register(RegisterView),
    Memory(u32),
    Immediate(u32),
}

/// Applies `operand`'s addressing mode. Post-increment and pre-decrement
/// update their base register by `size` here, so each operand must be
/// resolved exactly once.
pub fn resolve(regs: &mut RegisterFile, operand: Operand, size: Size) -> Resolved {
    match operand {
        Operand::Register(view) => Resolved::Register(view),
        Operand::Immediate(value) => Resolved::Immediate(value),
        Operand::Absolute8(aa) => Resolved::Memory(ABSOLUTE8_BASE | u32::from(aa)),
        Operand::Absolute16(aa) => Resolved::Memory(ABSOLUTE16_BASE | u32::from(aa)),
        Operand::Absolute24(aa) => Resolved::Memory(aa & ABSOLUTE24_MASK),
        Operand::Indirect(n) => Resolved::Memory(regs.er(n)),
        Operand::Displacement { base, disp } => {
            Resolved::Memory(regs.er(base).wrapping_add(disp as i32 as u32))
        }
        Operand::PostIncrement(n) => {
            let address = regs.er(n);
            regs.set_er(n, address.wrapping_add(size.bytes()));
            Resolved::Memory(address)
        }
        Operand::PreDecrement(n) => {
            let address = regs.er(n).wrapping_sub(size.bytes());
            regs.set_er(n, address);
            Resolved::Memory(address)
        }
    }
}

impl Resolved {
    pub fn read<M: Memory + ?Sized>(&self, regs: &RegisterFile, memory: &M, size: Size) -> u32 {
        match *self {
            Resolved::Register(view) => regs.get(view),
            Resolved::Immediate(value) => value & size.mask(),
            Resolved::Memory(address) => match size {
                Size::Byte => memory.read_u8(address).into(),
                Size::Word => memory.read_u16(address).into(),
                Size::Long => memory.read_u32(address),
            },
        }
    }

    pub fn write<M: Memory + ?Sized>(
        &self,
        regs: &mut RegisterFile,
        memory: &mut M,
        size: Size,
        value: u32,
    ) -> Result<()> {
        match *self {
            Resolved::Register(view) => regs.set(view, value),
            Resolved::Immediate(literal) => return Err(ExecuteError::ImmediateDestination(literal)),
            Resolved::Memory(address) => match size {
                Size::Byte => memory.write_u8(address, value as u8),
                Size::Word => memory.write_u16(address, value as u16),
                Size::Long => memory.write_u32(address, value),
            },
        }
        Ok(())
    }

    pub fn address(&self) -> Option<u32> {
        match *self {
            Resolved::Memory(address) => Some(address),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use h8sim_core::AddressSpace;

    use super::*;

    #[test]
    fn post_increment_reads_then_advances() {
        let mut regs = RegisterFile::new();
        let mut memory = AddressSpace::new();
        memory.write_u32(0x1000, 0xDEAD_BEEF);
        regs.set_er(0, 0x1000);

        let resolved = resolve(&mut regs, Operand::PostIncrement(0), Size::Long);
        assert_eq!(resolved, Resolved::Memory(0x1000));
        assert_eq!(regs.er(0), 0x1004);
        assert_eq!(resolved.read(&regs, &memory, Size::Long), 0xDEAD_BEEF);
    }

    #[test]
    fn pre_decrement_retreats_then_accesses() {
        let mut regs = RegisterFile::new();
        let mut memory = AddressSpace::new();
        regs.set_er(1, 0x2004);

        let resolved = resolve(&mut regs, Operand::PreDecrement(1), Size::Long);
        assert_eq!(regs.er(1), 0x2000);
        assert_eq!(resolved, Resolved::Memory(0x2000));
        resolved
            .write(&mut regs, &mut memory, Size::Long, 0x0102_0304)
            .unwrap();
        assert_eq!(memory.read(0x2000, 4), vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn step_follows_operand_size() {
        let mut regs = RegisterFile::new();
        regs.set_er(2, 0x3000);
        resolve(&mut regs, Operand::PostIncrement(2), Size::Byte);
        assert_eq!(regs.er(2), 0x3001);
        resolve(&mut regs, Operand::PostIncrement(2), Size::Word);
        assert_eq!(regs.er(2), 0x3003);
        resolve(&mut regs, Operand::PreDecrement(2), Size::Word);
        assert_eq!(regs.er(2), 0x3001);
    }

    #[test]
    fn absolute_forms_extend_into_the_top_page() {
        let mut regs = RegisterFile::new();
        assert_eq!(
            resolve(&mut regs, Operand::Absolute8(0x80), Size::Byte),
            Resolved::Memory(0x00FF_FF80)
        );
        assert_eq!(
            resolve(&mut regs, Operand::Absolute16(0xF780), Size::Word),
            Resolved::Memory(0x00FF_F780)
        );
        assert_eq!(
            resolve(&mut regs, Operand::Absolute24(0xFF01_2345), Size::Long),
            Resolved::Memory(0x0001_2345)
        );
    }

    #[test]
    fn absolute8_lands_in_the_last_page_of_memory() {
        let mut regs = RegisterFile::new();
        let mut memory = AddressSpace::new();
        let resolved = resolve(&mut regs, Operand::Absolute8(0x10), Size::Byte);
        resolved.write(&mut regs, &mut memory, Size::Byte, 0xAB).unwrap();
        assert_eq!(memory.read_u8(0xFF10), 0xAB);
    }

    #[test]
    fn displacement_is_sign_extended() {
        let mut regs = RegisterFile::new();
        regs.set_er(6, 0xF800);
        assert_eq!(
            resolve(&mut regs, Operand::Displacement { base: 6, disp: -2 }, Size::Word),
            Resolved::Memory(0xF7FE)
        );
        assert_eq!(
            resolve(&mut regs, Operand::Displacement { base: 6, disp: 0x10 }, Size::Word),
            Resolved::Memory(0xF810)
        );
        assert_eq!(regs.er(6), 0xF800);

        regs.set_er(6, 0);
        assert_eq!(
            resolve(&mut regs, Operand::Displacement { base: 6, disp: -1 }, Size::Byte),
            Resolved::Memory(0xFFFF_FFFF)
        );
    }

    #[test]
    fn register_operands_use_their_view() {
        let mut regs = RegisterFile::new();
        let mut memory = AddressSpace::new();
        regs.set_er(4, 0x1122_3344);
        let resolved = resolve(&mut regs, Operand::Register(RegisterView::Rh(4)), Size::Byte);
        assert_eq!(resolved.read(&regs, &memory, Size::Byte), 0x33);
        resolved.write(&mut regs, &mut memory, Size::Byte, 0xFF).unwrap();
        assert_eq!(regs.er(4), 0x1122_FF44);
        assert_eq!(resolved.address(), None);
    }

    #[test]
    fn immediates_read_but_never_write() {
        let mut regs = RegisterFile::new();
        let mut memory = AddressSpace::new();
        let resolved = resolve(&mut regs, Operand::Immediate(0x1234), Size::Word);
        assert_eq!(resolved.read(&regs, &memory, Size::Word), 0x1234);
        assert_eq!(
            resolved.write(&mut regs, &mut memory, Size::Word, 0),
            Err(ExecuteError::ImmediateDestination(0x1234))
        );
    }
}
