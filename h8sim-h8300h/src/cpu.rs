use h8sim_core::Memory;
use thiserror::Error;
use tracing::debug;

use crate::addressing::{resolve, Resolved};
use crate::flags::{compute_add, compute_move, Flags};
use crate::isa::{Instruction, Operand, Operation, Size};
use crate::registers::RegisterFile;
use crate::stack::{pop_word, push_word};

#[derive(Debug, Error, Clone, PartialEq, Eq, Hash)]
pub enum ExecuteError {
    #[error("destination is the immediate #0x{0:X}")]
    ImmediateDestination(u32),
}

pub type Result<T> = std::result::Result<T, ExecuteError>;

/// One store performed by an instruction, stack pushes included.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MemoryWrite {
    pub address: u32,
    pub size: Size,
    pub value: u32,
}

impl MemoryWrite {
    /// The stored bytes in memory order, each with its truncated address.
    pub fn bytes(&self) -> impl Iterator<Item = (u16, u8)> {
        let MemoryWrite {
            address,
            size,
            value,
        } = *self;
        let count = size.bytes();
        (0..count).map(move |offset| {
            let shift = 8 * (count - 1 - offset);
            (address.wrapping_add(offset) as u16, (value >> shift) as u8)
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BranchOutcome {
    pub target: u16,
    pub taken: bool,
}

/// What executing one instruction did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Execution {
    pub next_pc: u16,
    /// Operands after addressing, source first.
    pub operands: Vec<Resolved>,
    pub branch: Option<BranchOutcome>,
    pub writes: Vec<MemoryWrite>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct H8Cpu {
    regs: RegisterFile,
    flags: Flags,
    pc: u16,
}

impl H8Cpu {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    /// Skips `length` bytes without executing anything.
    pub fn advance(&mut self, length: usize) {
        self.pc = self.pc.wrapping_add(length as u16);
    }

    pub fn regs(&self) -> &RegisterFile {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    pub fn flags(&self) -> &Flags {
        &self.flags
    }

    pub fn flags_mut(&mut self) -> &mut Flags {
        &mut self.flags
    }

    /// Executes `instruction`, which must have been fetched at the current
    /// PC. On error PC is left where it was and flags are untouched, but
    /// post-increment and pre-decrement operands have already moved their
    /// base registers.
    pub fn execute<M: Memory + ?Sized>(
        &mut self,
        instruction: &Instruction,
        memory: &mut M,
    ) -> Result<Execution> {
        let next = self.pc.wrapping_add(instruction.length as u16);
        let mut execution = Execution {
            next_pc: next,
            ..Default::default()
        };

        match instruction.operation {
            Operation::Nop => {}
            Operation::Mov { size, src, dst } => {
                let src = resolve(&mut self.regs, src, size);
                let dst = resolve(&mut self.regs, dst, size);
                execution.operands = vec![src, dst];

                let value = src.read(&self.regs, memory, size);
                let update = compute_move(value, size);
                self.store(&mut execution, dst, memory, size, value)?;
                self.flags.apply(update);
            }
            Operation::Add { size, src, dst } => {
                let src = resolve(&mut self.regs, src, size);
                let dst = resolve(&mut self.regs, dst, size);
                execution.operands = vec![src, dst];

                let op2 = src.read(&self.regs, memory, size);
                let op1 = dst.read(&self.regs, memory, size);
                let update = compute_add(op1, op2, size);
                let sum = op1.wrapping_add(op2) & size.mask();
                self.store(&mut execution, dst, memory, size, sum)?;
                self.flags.apply(update);
            }
            Operation::Branch { condition, disp } => {
                let target = next.wrapping_add(disp as u16);
                let taken = condition.evaluate(&self.flags);
                if taken {
                    debug!(
                        "{} taken from 0x{:04X} to 0x{:04X}",
                        condition.mnemonic(),
                        self.pc,
                        target
                    );
                    execution.next_pc = target;
                }
                execution.branch = Some(BranchOutcome { target, taken });
            }
            Operation::Bsr { disp } => {
                let target = next.wrapping_add(disp as u16);
                self.call(&mut execution, memory, next, target);
            }
            Operation::Jmp { target } => {
                let target = self.jump_target(&mut execution, target);
                debug!("jump from 0x{:04X} to 0x{:04X}", self.pc, target);
                execution.next_pc = target;
                execution.branch = Some(BranchOutcome {
                    target,
                    taken: true,
                });
            }
            Operation::Jsr { target } => {
                let target = self.jump_target(&mut execution, target);
                self.call(&mut execution, memory, next, target);
            }
            Operation::Rts => {
                let target = pop_word(&mut self.regs, memory);
                debug!("return from 0x{:04X} to 0x{:04X}", self.pc, target);
                execution.next_pc = target;
                execution.branch = Some(BranchOutcome {
                    target,
                    taken: true,
                });
            }
        }

        self.pc = execution.next_pc;
        Ok(execution)
    }

    fn store<M: Memory + ?Sized>(
        &mut self,
        execution: &mut Execution,
        dst: Resolved,
        memory: &mut M,
        size: Size,
        value: u32,
    ) -> Result<()> {
        dst.write(&mut self.regs, memory, size, value)?;
        if let Some(address) = dst.address() {
            execution.writes.push(MemoryWrite {
                address,
                size,
                value: value & size.mask(),
            });
        }
        Ok(())
    }

    /// The effective address of a JMP/JSR operand, truncated to PC width.
    fn jump_target(&mut self, execution: &mut Execution, target: Operand) -> u16 {
        let resolved = resolve(&mut self.regs, target, Size::Long);
        execution.operands = vec![resolved];
        match resolved {
            Resolved::Memory(address) => address as u16,
            Resolved::Register(view) => self.regs.get(view) as u16,
            Resolved::Immediate(value) => value as u16,
        }
    }

    fn call<M: Memory + ?Sized>(
        &mut self,
        execution: &mut Execution,
        memory: &mut M,
        return_address: u16,
        target: u16,
    ) {
        let address = push_word(&mut self.regs, memory, return_address);
        debug!(
            "call from 0x{:04X} to 0x{:04X}, returning to 0x{:04X}",
            self.pc, target, return_address
        );
        execution.writes.push(MemoryWrite {
            address,
            size: Size::Word,
            value: return_address.into(),
        });
        execution.next_pc = target;
        execution.branch = Some(BranchOutcome {
            target,
            taken: true,
        });
    }
}

#[cfg(test)]
mod tests {
    use h8sim_core::AddressSpace;

    use super::*;
    use crate::isa::Condition;
    use crate::registers::RegisterView;

    fn at(pc: u16) -> (H8Cpu, AddressSpace) {
        let mut cpu = H8Cpu::new();
        cpu.set_pc(pc);
        (cpu, AddressSpace::new())
    }

    fn run(
        cpu: &mut H8Cpu,
        memory: &mut AddressSpace,
        operation: Operation,
        length: usize,
    ) -> Execution {
        let instruction = Instruction::new(operation, 0, length);
        cpu.execute(&instruction, memory).unwrap()
    }

    #[test]
    fn mov_immediate_sets_flags_and_register() {
        let (mut cpu, mut memory) = at(0);
        cpu.flags_mut().c = true;
        let execution = run(
            &mut cpu,
            &mut memory,
            Operation::Mov {
                size: Size::Word,
                src: Operand::Immediate(0x8000),
                dst: Operand::Register(RegisterView::E(2)),
            },
            4,
        );
        assert_eq!(cpu.regs().er(2), 0x8000_0000);
        assert!(cpu.flags().n);
        assert!(!cpu.flags().z);
        assert!(cpu.flags().c);
        assert_eq!(execution.next_pc, 4);
        assert_eq!(cpu.pc(), 4);
        assert!(execution.writes.is_empty());
    }

    #[test]
    fn push_long_records_the_store() {
        let (mut cpu, mut memory) = at(0x10);
        cpu.regs_mut().set_sp(0xFF00);
        cpu.regs_mut().set_er(3, 0x1234_5678);
        let execution = run(
            &mut cpu,
            &mut memory,
            Operation::Mov {
                size: Size::Long,
                src: Operand::Register(RegisterView::Er(3)),
                dst: Operand::PreDecrement(7),
            },
            4,
        );
        assert_eq!(cpu.regs().sp(), 0xFEFC);
        assert_eq!(memory.read_u32(0xFEFC), 0x1234_5678);
        assert_eq!(
            execution.writes,
            vec![MemoryWrite {
                address: 0xFEFC,
                size: Size::Long,
                value: 0x1234_5678,
            }]
        );
        assert_eq!(
            execution.writes[0].bytes().collect::<Vec<_>>(),
            vec![(0xFEFC, 0x12), (0xFEFD, 0x34), (0xFEFE, 0x56), (0xFEFF, 0x78)]
        );
    }

    #[test]
    fn pop_long_reads_then_advances() {
        let (mut cpu, mut memory) = at(0);
        cpu.regs_mut().set_sp(0xFEFC);
        memory.write_u32(0xFEFC, 0xCAFE_0000);
        run(
            &mut cpu,
            &mut memory,
            Operation::Mov {
                size: Size::Long,
                src: Operand::PostIncrement(7),
                dst: Operand::Register(RegisterView::Er(0)),
            },
            4,
        );
        assert_eq!(cpu.regs().er(0), 0xCAFE_0000);
        assert_eq!(cpu.regs().sp(), 0xFF00);
        assert!(cpu.flags().n);
    }

    #[test]
    fn add_immediate_wraps_byte_register() {
        let (mut cpu, mut memory) = at(0);
        cpu.regs_mut().set_rl(1, 0xFF);
        run(
            &mut cpu,
            &mut memory,
            Operation::Add {
                size: Size::Byte,
                src: Operand::Immediate(0x01),
                dst: Operand::Register(RegisterView::Rl(1)),
            },
            2,
        );
        assert_eq!(cpu.regs().er(1), 0);
        assert!(cpu.flags().z);
        assert!(cpu.flags().c);
        assert!(cpu.flags().h);
    }

    #[test]
    fn add_long_registers() {
        let (mut cpu, mut memory) = at(0);
        cpu.regs_mut().set_er(0, 0x7FFF_FFFF);
        cpu.regs_mut().set_er(1, 1);
        run(
            &mut cpu,
            &mut memory,
            Operation::Add {
                size: Size::Long,
                src: Operand::Register(RegisterView::Er(1)),
                dst: Operand::Register(RegisterView::Er(0)),
            },
            2,
        );
        assert_eq!(cpu.regs().er(0), 0x8000_0000);
        assert!(cpu.flags().v);
        assert!(cpu.flags().n);
        assert!(!cpu.flags().c);
    }

    #[test]
    fn branch_is_relative_to_next_instruction() {
        let (mut cpu, mut memory) = at(0x200);
        let execution = run(
            &mut cpu,
            &mut memory,
            Operation::Branch {
                condition: Condition::Always,
                disp: -4,
            },
            2,
        );
        assert_eq!(cpu.pc(), 0x1FE);
        assert_eq!(
            execution.branch,
            Some(BranchOutcome {
                target: 0x1FE,
                taken: true,
            })
        );
    }

    #[test]
    fn untaken_branch_falls_through() {
        let (mut cpu, mut memory) = at(0x200);
        let execution = run(
            &mut cpu,
            &mut memory,
            Operation::Branch {
                condition: Condition::Equal,
                disp: 0x40,
            },
            4,
        );
        assert_eq!(cpu.pc(), 0x204);
        assert_eq!(
            execution.branch,
            Some(BranchOutcome {
                target: 0x244,
                taken: false,
            })
        );
    }

    #[test]
    fn call_and_return_restore_pc_and_sp() {
        let (mut cpu, mut memory) = at(0x100);
        cpu.regs_mut().set_sp(0xFF00);
        let call = run(&mut cpu, &mut memory, Operation::Bsr { disp: 0x1E }, 2);
        assert_eq!(cpu.pc(), 0x120);
        assert_eq!(cpu.regs().sp(), 0xFEFE);
        assert_eq!(memory.read_u16(0xFEFE), 0x102);
        assert_eq!(call.writes.len(), 1);
        assert_eq!(call.writes[0].value, 0x102);

        run(&mut cpu, &mut memory, Operation::Rts, 2);
        assert_eq!(cpu.pc(), 0x102);
        assert_eq!(cpu.regs().sp(), 0xFF00);
    }

    #[test]
    fn jsr_through_register_and_absolute() {
        let (mut cpu, mut memory) = at(0x100);
        cpu.regs_mut().set_sp(0xFF00);
        cpu.regs_mut().set_er(2, 0x0012_0400);
        run(
            &mut cpu,
            &mut memory,
            Operation::Jsr {
                target: Operand::Indirect(2),
            },
            2,
        );
        assert_eq!(cpu.pc(), 0x0400);
        assert_eq!(memory.read_u16(0xFEFE), 0x102);

        run(
            &mut cpu,
            &mut memory,
            Operation::Jsr {
                target: Operand::Absolute24(0x0800),
            },
            4,
        );
        assert_eq!(cpu.pc(), 0x0800);
        assert_eq!(memory.read_u16(0xFEFC), 0x404);
        assert_eq!(cpu.regs().sp(), 0xFEFC);
    }

    #[test]
    fn jmp_replaces_pc_without_touching_stack() {
        let (mut cpu, mut memory) = at(0x10);
        cpu.regs_mut().set_sp(0xFF00);
        let execution = run(
            &mut cpu,
            &mut memory,
            Operation::Jmp {
                target: Operand::Absolute24(0x01_2000),
            },
            4,
        );
        assert_eq!(cpu.pc(), 0x2000);
        assert_eq!(cpu.regs().sp(), 0xFF00);
        assert!(execution.writes.is_empty());
    }

    #[test]
    fn immediate_destination_faults_without_side_effects() {
        let (mut cpu, mut memory) = at(0x40);
        let instruction = Instruction::new(
            Operation::Mov {
                size: Size::Byte,
                src: Operand::Immediate(0),
                dst: Operand::Immediate(7),
            },
            0,
            2,
        );
        assert_eq!(
            cpu.execute(&instruction, &mut memory),
            Err(ExecuteError::ImmediateDestination(7))
        );
        assert_eq!(cpu.pc(), 0x40);
        assert_eq!(*cpu.flags(), Flags::default());
    }

    #[test]
    fn fault_keeps_register_side_effects_of_earlier_operands() {
        let (mut cpu, mut memory) = at(0x40);
        cpu.regs_mut().set_er(1, 0xF780);
        cpu.flags_mut().z = true;
        let instruction = Instruction::new(
            Operation::Mov {
                size: Size::Word,
                src: Operand::PostIncrement(1),
                dst: Operand::Immediate(3),
            },
            0,
            2,
        );
        assert_eq!(
            cpu.execute(&instruction, &mut memory),
            Err(ExecuteError::ImmediateDestination(3))
        );
        assert_eq!(cpu.regs().er(1), 0xF782);
        assert_eq!(cpu.pc(), 0x40);
        assert!(cpu.flags().z);
    }

    #[test]
    fn memory_write_bytes_wrap_at_window_end() {
        let write = MemoryWrite {
            address: 0xFFFF,
            size: Size::Word,
            value: 0xABCD,
        };
        assert_eq!(
            write.bytes().collect::<Vec<_>>(),
            vec![(0xFFFF, 0xAB), (0x0000, 0xCD)]
        );
    }
}
