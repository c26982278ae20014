use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use h8sim_core::{Machine, NullSink};
use h8sim_h8300h::H8Machine;
use tracing_flame::{FlameLayer, FlushGuard};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

mod printer;

use crate::printer::TextPrinter;

#[derive(Parser, Debug)]
#[command(version, about = "Steps an H8/300H firmware image and prints a trace.", long_about = None)]
struct Args {
    /// Raw firmware image, loaded at address 0.
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    /// Stop after this many steps if the image has not halted.
    #[arg(long, value_name = "N")]
    max_steps: Option<u64>,

    /// Run without printing the trace.
    #[arg(long)]
    quiet: bool,

    /// Tracing filter, used when RUST_LOG is not set.
    #[arg(long, value_name = "FILTER", default_value = "warn")]
    log: String,

    /// Write folded stacks for a flame graph to this file.
    #[arg(long, value_name = "PATH")]
    flame: Option<PathBuf>,
}

fn init_tracing(args: &Args) -> Result<Option<FlushGuard<BufWriter<File>>>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&args.log)
            .with_context(|| format!("invalid log filter {:?}", args.log))?,
    };
    let stderr_format = tracing_subscriber::fmt::layer().with_writer(io::stderr);

    let (flame, guard) = match &args.flame {
        Some(path) => {
            let (layer, guard) = FlameLayer::with_file(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_format)
        .with(flame)
        .init();
    Ok(guard)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _flame_guard = init_tracing(&args)?;

    let mut machine = H8Machine::new();
    machine
        .load_file(&args.image)
        .with_context(|| format!("failed to load {}", args.image.display()))?;

    let _run = tracing::info_span!("run").entered();
    let mut printer = TextPrinter::new(BufWriter::new(io::stdout().lock()));
    let summary = if args.quiet {
        machine.run(&mut NullSink, args.max_steps)
    } else {
        machine.run(&mut printer, args.max_steps)
    };
    printer.summary(&summary);
    printer.finish().context("failed to write trace")?;
    Ok(())
}
