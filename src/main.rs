//! vmsim - hierarchical page-table virtual memory simulator
//!
//! Usage: vmsim [OPTIONS] <COMMAND>
//!
//! Commands:
//!   demo       Write a value to every fifth page, twice the frame count, and read it all back
//!   run        Execute an operation script (`w <address> <value>` / `r <address>`)
//!   translate  Translate virtual addresses to physical addresses (-1 for errors)
//!
//! Geometry flags (`--offset-width`, `--physical-width`, `--virtual-width`,
//! `--depth`, `--frames`) override the built-in machine; `-v` raises the log level.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::{debug, info};

use hierarchical_vm::constants::{
    OFFSET_WIDTH, PHYSICAL_ADDRESS_WIDTH, TABLES_DEPTH, VIRTUAL_ADDRESS_WIDTH,
};
use hierarchical_vm::io::{
    join_results, read_script, read_virtual_addresses, run_script, write_output,
};
use hierarchical_vm::{Geometry, VirtualAddress, VirtualMemory, Word, logger};

#[derive(Parser)]
#[command(name = "vmsim")]
#[command(about = "Hierarchical page-table virtual memory simulator")]
struct Cli {
    #[command(flatten)]
    geometry: GeometryArgs,

    /// Increase logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GeometryArgs {
    /// log2 of the page size in words
    #[arg(long, default_value_t = OFFSET_WIDTH, global = true)]
    offset_width: u32,

    /// Physical address width in bits
    #[arg(long, default_value_t = PHYSICAL_ADDRESS_WIDTH, global = true)]
    physical_width: u32,

    /// Virtual address width in bits
    #[arg(long, default_value_t = VIRTUAL_ADDRESS_WIDTH, global = true)]
    virtual_width: u32,

    /// Number of page-table levels
    #[arg(long, default_value_t = TABLES_DEPTH, global = true)]
    depth: u32,

    /// Number of physical frames (defaults to the physical address space)
    #[arg(long, global = true)]
    frames: Option<usize>,
}

impl GeometryArgs {
    fn build(&self) -> Result<Geometry> {
        let geometry = Geometry::new(
            self.offset_width,
            self.physical_width,
            self.virtual_width,
            self.depth,
        )
        .context("invalid geometry")?;
        match self.frames {
            Some(frames) => geometry.with_num_frames(frames).context("invalid frame count"),
            None => Ok(geometry),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fill every fifth page up to twice the frame count and verify it reads back
    Demo,

    /// Execute an operation script
    Run {
        /// Script with one `w <address> <value>` or `r <address>` per line
        script: PathBuf,

        /// Output file (one result per line); stdout if omitted
        output: Option<PathBuf>,
    },

    /// Translate whitespace-separated virtual addresses
    Translate {
        /// File containing virtual addresses
        input: PathBuf,

        /// Output file for physical addresses; stdout if omitted
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logger::init(logger::level_for(cli.verbose)) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(&cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let geometry = cli.geometry.build()?;
    debug!("geometry: {:?}", geometry);
    let mut vm = VirtualMemory::new(geometry);

    match &cli.command {
        Commands::Demo => demo(&mut vm)?,
        Commands::Run { script, output } => {
            let ops = read_script(script)?;
            info!(
                "executing {} operations from {}",
                ops.len(),
                script.display()
            );
            let results = run_script(&mut vm, &ops);
            write_output(output.as_deref(), &join_results(&results, "\n"))?;
        }
        Commands::Translate { input, output } => {
            let vas = read_virtual_addresses(input)?;
            for &va in vas.iter().filter(|&&va| va < geometry.virtual_memory_size()) {
                debug!("{}", VirtualAddress::decompose(&geometry, va));
            }
            let results = vm.translate_batch(&vas);
            write_output(output.as_deref(), &join_results(&results, " "))?;
        }
    }

    info!("{}", summary(&vm));
    Ok(())
}

/// Write `i` at `5 * i * page_size` for `i < 2 * frames`, then read it all back.
fn demo(vm: &mut VirtualMemory) -> Result<()> {
    let stride = 5 * vm.geometry().page_size() as u64;
    let count = 2 * vm.geometry().num_frames() as u64;

    for i in 0..count {
        info!("writing to {}", i);
        vm.write(i * stride, i as Word)
            .with_context(|| format!("write {} failed", i))?;
    }

    for i in 0..count {
        let value = vm.read(i * stride).with_context(|| format!("read {} failed", i))?;
        info!("reading from {} {}", i, value);
        if value != i as Word {
            bail!("page {} read back {} instead of {}", i * 5, value, i);
        }
    }

    println!("success");
    println!("{}", summary(vm));
    Ok(())
}

fn summary(vm: &VirtualMemory) -> String {
    let stats = vm.stats();
    format!(
        "faults: {} (reused empty {}, allocated {}, evicted {}), pages restored: {}, \
         pages in swap: {}, frames in use: {}",
        stats.faults,
        stats.reused_empty,
        stats.allocated,
        stats.evictions,
        stats.restores,
        vm.store().len(),
        vm.frames_in_use()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_swapped_pages() {
        let geometry = Geometry::new(2, 5, 6, 2)
            .unwrap()
            .with_num_frames(3)
            .unwrap();
        let mut vm = VirtualMemory::new(geometry);
        // one data page fits at a time, so each new page pushes the last one out
        for page in 0..4u64 {
            vm.write(page << 2, 1).unwrap();
        }
        assert_eq!(vm.store().len(), 3);
        let text = summary(&vm);
        assert!(text.contains("pages in swap: 3"), "{}", text);
        assert!(text.contains("frames in use: 3"), "{}", text);
    }
}
