//! cellemu - headless Cell PPU runner
//!
//! Loads a raw big-endian code image into guest memory, runs it on one PPU
//! thread with the HLE kernel attached and dumps the register file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use ce_core::config::Config;
use ce_lv2::Lv2Kernel;
use ce_memory::constants::{MAIN_MEM_BASE, STACK_BASE};
use ce_memory::MemoryManager;
use ce_ppu::{PpuInterpreter, PpuThread};
use clap::Parser;

const DEFAULT_LOAD_BASE: u32 = MAIN_MEM_BASE + 0x1_0000;

fn parse_address(text: &str) -> Result<u32, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|err| format!("invalid address `{text}`: {err}"))
}

#[derive(Debug, Parser)]
#[command(name = "cellemu", about = "Run a raw PPU code image and dump the register file")]
struct Args {
    /// Raw big-endian instruction image
    image: PathBuf,

    /// Guest address the image is loaded at
    #[arg(long, value_parser = parse_address, default_value_t = DEFAULT_LOAD_BASE)]
    base: u32,

    /// Entry point (defaults to the load base)
    #[arg(long, value_parser = parse_address)]
    entry: Option<u32>,

    /// Instruction budget (defaults to `ppu.max_steps` from the config file)
    #[arg(long)]
    steps: Option<u64>,

    /// Configuration file to use instead of the per-user one
    #[arg(long)]
    config: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<Config> {
    match &args.config {
        Some(path) => Config::load_from(path).with_context(|| format!("failed to load {}", path.display())),
        None => Ok(Config::load().unwrap_or_default()),
    }
}

fn dump_registers(thread: &PpuThread) {
    for row in 0..8 {
        let line: Vec<String> = (0..4)
            .map(|col| {
                let reg = row * 4 + col;
                format!("r{:<2} = 0x{:016x}", reg, thread.gpr(reg))
            })
            .collect();
        println!("{}", line.join("  "));
    }
    println!("pc    = 0x{:016x}", thread.pc());
    println!("cr    = 0x{:08x}", thread.regs.cr);
    println!("lr    = 0x{:016x}", thread.regs.lr);
    println!("ctr   = 0x{:016x}", thread.regs.ctr);
    println!("xer   = 0x{:016x}", thread.regs.xer);
    println!("fpscr = 0x{:08x}", thread.regs.fpscr);
    println!("vscr  = 0x{:08x}", thread.regs.vscr);
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    ce_core::logging::init(&config);

    let image = std::fs::read(&args.image).with_context(|| format!("failed to read {}", args.image.display()))?;
    let memory = MemoryManager::from_config(&config.memory).context("failed to map guest memory")?;
    memory
        .write_bytes(args.base, &image)
        .with_context(|| format!("image does not fit at 0x{:08x}", args.base))?;

    let kernel = Arc::new(Lv2Kernel::new(Arc::clone(&memory)).with_timebase_frequency(config.ppu.timebase_frequency));
    let ppu = PpuInterpreter::new(Arc::clone(&memory))
        .with_config(&config.ppu)
        .with_syscalls(kernel.clone());

    let entry = args.entry.unwrap_or(args.base);
    let stack_top = STACK_BASE as u64 + config.memory.stack_size as u64 - 0x100;
    let mut thread = PpuThread::new(1);
    thread.set_pc(entry as u64);
    thread.set_gpr(1, stack_top & !0xF);
    thread.start();

    let budget = args.steps.unwrap_or(config.ppu.max_steps);
    tracing::info!("Running {} ({} bytes) from 0x{:08x}, budget {}", args.image.display(), image.len(), entry, budget);

    let outcome = ppu.run(&mut thread, budget);
    dump_registers(&thread);
    let steps = outcome.with_context(|| format!("execution stopped at 0x{:08x}", thread.pc()))?;

    match thread.exit_code {
        Some(code) => println!("exited with status {code} after {steps} instructions"),
        None => println!("stopped after {steps} instructions"),
    }
    Ok(())
}
