use h8sim_core::decoder::{DecodeError, DecodeOne};
use h8sim_core::machine::{Machine, Result};
use h8sim_core::memory::{AddressSpace, Memory, Region};
use tracing::{info, trace, trace_span, warn};

use crate::cpu::H8Cpu;
use crate::decoder::{H8Decoder, MAX_INSTRUCTION_LEN};
use crate::trace::{TraceEvent, TraceRecord};

/// An H8/300H core wired to a flat 64 KiB address space.
///
/// The machine halts when PC lands exactly on the end of the loaded image.
#[derive(Debug, Default)]
pub struct H8Machine {
    cpu: H8Cpu,
    memory: AddressSpace,
    decoder: H8Decoder,
    image_len: usize,
}

impl H8Machine {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn cpu(&self) -> &H8Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut H8Cpu {
        &mut self.cpu
    }

    pub fn memory(&self) -> &AddressSpace {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut AddressSpace {
        &mut self.memory
    }

    pub fn image_len(&self) -> usize {
        self.image_len
    }

    pub fn region(&self, address: u32) -> Region {
        self.memory.region(address)
    }
}

impl Machine for H8Machine {
    type Record = TraceRecord;

    fn load(&mut self, image: &[u8]) -> Result<()> {
        self.memory.load(image)?;
        self.cpu.reset();
        self.image_len = image.len();
        info!("loaded {} byte image", image.len());
        Ok(())
    }

    fn is_halted(&self) -> bool {
        usize::from(self.cpu.pc()) == self.image_len
    }

    fn step(&mut self) -> TraceRecord {
        let pc = self.cpu.pc();
        let _span = trace_span!("step", pc).entered();
        let bytes = self.memory.read(pc.into(), MAX_INSTRUCTION_LEN);

        let (opcode, length, event) = match self.decoder.decode_one(&bytes) {
            Ok(instruction) => {
                trace!("0x{:04X}: {}", pc, instruction);
                let opcode = instruction.opcode;
                let length = instruction.length;
                let event = match self.cpu.execute(&instruction, &mut self.memory) {
                    Ok(execution) => TraceEvent::Executed {
                        instruction,
                        execution,
                    },
                    Err(error) => {
                        warn!("0x{:04X}: {} faulted: {}", pc, instruction, error);
                        self.cpu.advance(length);
                        TraceEvent::Fault { instruction, error }
                    }
                };
                (opcode, length, event)
            }
            Err(err) => {
                self.cpu.advance(err.len_bytes());
                match err {
                    DecodeError::UnknownOpcode { opcode } => {
                        warn!("0x{:04X}: unknown opcode 0x{:04X}", pc, opcode);
                        (opcode, 2, TraceEvent::Unknown)
                    }
                    DecodeError::UnimplementedOpcode {
                        mnemonic,
                        opcode,
                        length,
                    } => {
                        trace!("0x{:04X}: {} is decode-only", pc, mnemonic);
                        (opcode, length, TraceEvent::Unimplemented { mnemonic })
                    }
                }
            }
        };

        let flags = *self.cpu.flags();
        trace!("0x{:04X}: CCR = 0x{:02X}", pc, flags.to_ccr());
        TraceRecord {
            pc,
            opcode,
            length,
            event,
            registers: self.cpu.regs().snapshot(),
            flags,
        }
    }
}
