use h8sim_core::Memory;

use crate::registers::RegisterFile;

/// Pushes a return address: SP -= 2, then the word is stored at SP.
/// Returns the address written.
pub fn push_word<M: Memory + ?Sized>(regs: &mut RegisterFile, memory: &mut M, value: u16) -> u32 {
    let sp = regs.sp().wrapping_sub(2);
    regs.set_sp(sp);
    memory.write_u16(sp, value);
    sp
}

/// Pops a return address: the word at SP is loaded, then SP += 2.
pub fn pop_word<M: Memory + ?Sized>(regs: &mut RegisterFile, memory: &M) -> u16 {
    let sp = regs.sp();
    let value = memory.read_u16(sp);
    regs.set_sp(sp.wrapping_add(2));
    value
}
