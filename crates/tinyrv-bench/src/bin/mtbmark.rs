//! Multi-core micro-benchmarks.
//!
//! Runs each kernel across every core of the tile with bare spawn / join
//! and verifies the result against the host reference.
//!
//! Usage:
//!   cargo run --bin mtbmark
//!   cargo run --bin mtbmark -- mt-matmul --cores 16 --size 64
//!   cargo run --bin mtbmark -- mt-vvadd --policy balanced --control-words
//!
//! `TINYRV_NUM_CORES`, `TINYRV_SIZE` and `TINYRV_POLICY` set the defaults
//! the flags override.

use anyhow::Result;
use tinyrv_bench::{run_benchmark, BenchReport, Benchmark, RunConfig};
use tinyrv_runtime::{ControlWordReporter, LogReporter};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let selected = match args.get(1).filter(|a| !a.starts_with("--")) {
        Some(name) => vec![name.parse::<Benchmark>()?],
        None => Benchmark::MULTI_CORE.to_vec(),
    };

    let mut config = RunConfig::from_env()?;
    config.num_cores = parse_arg(&args, "--cores", config.num_cores);
    let control_words = args.iter().any(|a| a == "--control-words");

    println!("TinyRV multi-core micro-benchmarks");
    println!("==================================");
    println!("Cores          : {}", config.num_cores);
    println!();

    let mut failed = 0;
    for bench in selected {
        let mut run = config.clone();
        run.size = Some(parse_arg(
            &args,
            "--size",
            config.size.unwrap_or_else(|| bench.default_size()),
        ));
        run.policy = Some(parse_arg(
            &args,
            "--policy",
            config.policy.unwrap_or_else(|| bench.default_policy()),
        ));

        let report = if control_words {
            let mut reporter = ControlWordReporter::new();
            let report = run_benchmark(bench, &run, &mut reporter)?;
            reporter.exit(u16::from(!report.passed()));
            print_control_words(&reporter.freeze());
            report
        } else {
            run_benchmark(bench, &run, &mut LogReporter::default())?
        };

        print_report(&report);
        if !report.passed() {
            failed += 1;
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} benchmark(s) failed");
    }
    Ok(())
}

fn print_report(report: &BenchReport) {
    println!("{report}");
    if let Some(part) = &report.partition {
        println!("  partition    : {part}");
    }
}

fn print_control_words(stream: &[u8]) {
    for word in stream.chunks_exact(4) {
        let word = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
        println!("  ctrl <- {word:#010x}");
    }
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
