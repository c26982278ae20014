use std::io::{self, Write};

use h8sim_core::{MemoryMap, RunSummary, TraceSink};
use h8sim_h8300h::{TraceEvent, TraceRecord};

/// Renders trace records as the plain-text step log.
///
/// A failed write stops all further output; the error is returned from
/// [`TextPrinter::finish`].
pub struct TextPrinter<W: Write> {
    out: W,
    map: MemoryMap,
    error: Option<io::Error>,
}

impl<W: Write> TextPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            map: MemoryMap::default(),
            error: None,
        }
    }

    fn write_record(&mut self, record: &TraceRecord) -> io::Result<()> {
        writeln!(self.out, "{}", record)?;
        for write in record.writes() {
            for (address, byte) in write.bytes() {
                writeln!(
                    self.out,
                    "MEMORY - 0x{:04x} -> {:02x} ({})",
                    address,
                    byte,
                    self.map.region(address.into())
                )?;
            }
        }
        if let TraceEvent::Executed { .. } = record.event {
            let registers: Vec<String> = record
                .registers
                .iter()
                .enumerate()
                .map(|(index, value)| format!("ER{}: [0x{:08X}]", index, value))
                .collect();
            writeln!(self.out, "{}", registers.join(", "))?;
            writeln!(self.out, "{}", record.flags)?;
            writeln!(self.out)?;
        }
        Ok(())
    }

    pub fn summary(&mut self, summary: &RunSummary) {
        let result = if summary.halted {
            writeln!(self.out, "halted after {} steps", summary.steps)
        } else {
            writeln!(self.out, "stopped after {} steps without halting", summary.steps)
        };
        self.keep_first_error(result);
    }

    fn keep_first_error(&mut self, result: io::Result<()>) {
        if let Err(err) = result {
            self.error.get_or_insert(err);
        }
    }

    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> TraceSink<TraceRecord> for TextPrinter<W> {
    fn record(&mut self, record: &TraceRecord) {
        if self.error.is_some() {
            return;
        }
        let result = self.write_record(record);
        self.keep_first_error(result);
    }
}
