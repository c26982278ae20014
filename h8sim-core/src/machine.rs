use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::memory::MemoryError;
use crate::trace::TraceSink;

#[derive(Debug, Error)]
pub enum MachineError {
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, MachineError>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: u64,
    pub halted: bool,
}

pub trait Machine {
    type Record;

    fn load(&mut self, image: &[u8]) -> Result<()>;
    fn is_halted(&self) -> bool;
    fn step(&mut self) -> Self::Record;

    fn load_file(&mut self, path: &Path) -> Result<()> {
        tracing::info!("loading image from {}", path.display());
        let image = fs::read(path)?;
        self.load(&image)
    }

    /// Steps until the machine halts or `max_steps` records have been
    /// emitted. Without a limit this never returns for firmware that does
    /// not reach its halt address.
    fn run<S>(&mut self, sink: &mut S, max_steps: Option<u64>) -> RunSummary
    where
        S: TraceSink<Self::Record> + ?Sized,
        Self: Sized,
    {
        let mut summary = RunSummary::default();
        loop {
            if self.is_halted() {
                summary.halted = true;
                tracing::info!("halted after {} steps", summary.steps);
                break;
            }
            if max_steps.is_some_and(|limit| summary.steps >= limit) {
                tracing::info!("step limit of {} reached", summary.steps);
                break;
            }
            let record = self.step();
            sink.record(&record);
            summary.steps += 1;
        }
        summary
    }
}
