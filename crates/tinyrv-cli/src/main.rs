//! `tinyrv` — command-line interface for the TinyRV micro-benchmark harness.
//!
//! ```text
//! USAGE:
//!   tinyrv list                          List benchmarks and supported core counts
//!   tinyrv run <benchmark>               Run one benchmark
//!   tinyrv suite                         Run every benchmark
//!   tinyrv partition <size>              Show how a domain splits across cores
//!   tinyrv xcel <value>                  Round-trip a value through the null accelerator
//!   tinyrv decode <file>                 Decode a control-port word stream
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tinyrv_bench::{run_benchmark, run_vvadd_fileio, BenchReport, Benchmark, RunConfig};
use tinyrv_chip::cores;
use tinyrv_runtime::{
    decode_control_words, partition, select_backend, BackendSelection, ControlMessage,
    ControlWordReporter, LogReporter, Policy, Reporter, Xcel, XcelBackend, XcelFunction,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tinyrv", about = "TinyRV multi-core micro-benchmark harness", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// List benchmarks and supported core counts.
    List,
    /// Run one benchmark.
    Run {
        /// Benchmark name (e.g. mt-vvadd, shellsort, vvadd-xcel).
        benchmark: String,
        #[command(flatten)]
        opts: RunOpts,
        /// Read the vvadd dataset from this file instead of generating it.
        #[arg(long)]
        file: Option<PathBuf>,
        /// Write the control-port word stream to this file.
        #[arg(long)]
        control_words: Option<PathBuf>,
    },
    /// Run every benchmark.
    Suite {
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Show how a domain splits across cores.
    Partition {
        /// Domain size (elements or rows).
        size: usize,
        /// Core count.
        #[arg(long, default_value_t = 4)]
        cores: usize,
        /// Remainder policy (tail | balanced). Both when omitted.
        #[arg(long)]
        policy: Option<Policy>,
    },
    /// Round-trip a value through the null accelerator.
    Xcel {
        /// Value written to xr0 (decimal or 0x-prefixed hex).
        value: String,
        /// Accelerator backend (auto | software | mmio).
        #[arg(long, default_value = "auto")]
        backend: BackendSelection,
        /// Register window for the MMIO backend.
        #[arg(long, default_value = tinyrv_bench::config::DEFAULT_WINDOW)]
        window: PathBuf,
    },
    /// Decode a control-port word stream.
    Decode {
        /// File of little-endian 32-bit words.
        file: PathBuf,
    },
}

/// Run configuration flags. Unset flags fall back to the environment,
/// then to the built-in defaults.
#[derive(Args)]
struct RunOpts {
    /// Core count (1, 2, 4, 8, 16, 32 or 64).
    #[arg(long, env = "TINYRV_NUM_CORES")]
    cores: Option<usize>,
    /// Problem size (elements, or N for N×N matmul).
    #[arg(long, env = "TINYRV_SIZE")]
    size: Option<usize>,
    /// Remainder policy (tail | balanced).
    #[arg(long, env = "TINYRV_POLICY")]
    policy: Option<Policy>,
    /// Accelerator backend (auto | software | mmio).
    #[arg(long, env = "TINYRV_BACKEND")]
    backend: Option<BackendSelection>,
    /// Register window for the MMIO backend.
    #[arg(long)]
    window: Option<PathBuf>,
}

impl RunOpts {
    fn config(self) -> RunConfig {
        let defaults = RunConfig::default();
        RunConfig {
            num_cores: self.cores.unwrap_or(defaults.num_cores),
            size: self.size,
            policy: self.policy,
            backend: self.backend.unwrap_or(defaults.backend),
            window: self.window.unwrap_or(defaults.window),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Cmd::List => cmd_list(),
        Cmd::Run {
            benchmark,
            opts,
            file,
            control_words,
        } => cmd_run(&benchmark, opts.config(), file, control_words)?,
        Cmd::Suite { opts } => cmd_suite(&opts.config())?,
        Cmd::Partition {
            size,
            cores,
            policy,
        } => cmd_partition(size, cores, policy),
        Cmd::Xcel {
            value,
            backend,
            window,
        } => cmd_xcel(&value, backend, &window)?,
        Cmd::Decode { file } => cmd_decode(&file)?,
    }

    Ok(())
}

fn cmd_list() {
    println!("Multi-core benchmarks:");
    for bench in Benchmark::MULTI_CORE {
        println!(
            "  {:<12} size={:<4} policy={}",
            bench.name(),
            bench.default_size(),
            bench.default_policy()
        );
    }
    println!("Single-core benchmarks:");
    for bench in Benchmark::SINGLE_CORE {
        println!("  {:<12} size={}", bench.name(), bench.default_size());
    }
    println!();
    println!("Core counts    : {:?}", cores::SUPPORTED);
    println!("Tail splits on : {:?} (wider tiles run on core 0)", cores::EVEN_SPLIT);
}

fn cmd_run(
    name: &str,
    config: RunConfig,
    file: Option<PathBuf>,
    control_words: Option<PathBuf>,
) -> Result<()> {
    let bench: Benchmark = name.parse()?;

    let mut words = ControlWordReporter::new();
    let mut log = LogReporter::default();
    let reporter: &mut dyn Reporter = if control_words.is_some() {
        &mut words
    } else {
        &mut log
    };

    let report = match file {
        Some(path) if bench == Benchmark::Vvadd => run_vvadd_fileio(&path, reporter)
            .with_context(|| format!("vvadd on {}", path.display()))?,
        Some(_) => anyhow::bail!("--file only applies to vvadd"),
        None => run_benchmark(bench, &config, reporter)?,
    };
    print_report(&report);

    if let Some(path) = control_words {
        words.exit(u16::from(!report.passed()));
        let stream = words.freeze();
        std::fs::write(&path, &stream)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Control words  : {} → {}", stream.len() / 4, path.display());
    }

    if !report.passed() {
        anyhow::bail!("{bench} failed verification");
    }
    Ok(())
}

fn cmd_suite(config: &RunConfig) -> Result<()> {
    println!("TinyRV suite: {} cores", config.num_cores);
    println!();

    let mut failed = Vec::new();
    for bench in Benchmark::ALL {
        let report = run_benchmark(bench, config, &mut LogReporter::default())
            .with_context(|| format!("{bench} failed to run"))?;
        print_report(&report);
        if !report.passed() {
            failed.push(bench.name());
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("failed: {}", failed.join(", "));
    }
    Ok(())
}

fn cmd_partition(size: usize, cores: usize, policy: Option<Policy>) {
    let policies = policy.map_or(Policy::ALL.to_vec(), |p| vec![p]);
    for policy in policies {
        let part = partition(size, cores, policy);
        println!(
            "{policy:<9} {size} over {cores} cores{}",
            if part.is_fallback() { " (core 0 only)" } else { "" }
        );
        for (core, range) in part.iter() {
            println!(
                "  {:<6} {:<12} {} elements",
                core.to_string(),
                range.to_string(),
                range.len()
            );
        }
        println!("  imbalance  {}", part.max_imbalance());
    }
}

fn cmd_xcel(value: &str, backend: BackendSelection, window: &std::path::Path) -> Result<()> {
    let value = parse_u32(value).with_context(|| format!("invalid value '{value}'"))?;
    let backend = select_backend(backend, XcelFunction::Null, window)?;
    println!("Backend : {}", backend.backend_type());

    let mut xcel = Xcel::new(backend);
    let result = tinyrv_bench::kernels::null_xcel(&mut xcel, value)?;
    println!("xr0 <- {value:#010x}");
    println!("xr0 -> {result:#010x}");

    if result != value {
        anyhow::bail!("null accelerator returned {result:#010x}, expected {value:#010x}");
    }
    Ok(())
}

fn cmd_decode(file: &std::path::Path) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    for message in decode_control_words(&bytes)? {
        match message {
            ControlMessage::Pass => println!("[PASSED]"),
            ControlMessage::Fail {
                index,
                actual,
                expected,
            } => println!("[FAILED] dest[{index}] != ref[{index}] ({actual} != {expected})"),
            ControlMessage::Exit(status) => println!("exit {status}"),
        }
    }
    Ok(())
}

fn print_report(report: &BenchReport) {
    println!("{report}");
    if let Some(part) = &report.partition {
        println!("  partition    : {part}");
    }
}

fn parse_u32(s: &str) -> Result<u32> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16)?,
        None => s.replace('_', "").parse()?,
    };
    Ok(parsed)
}
