//! Single-core and accelerator micro-benchmarks.
//!
//! Usage:
//!   cargo run --bin ubmark
//!   cargo run --bin ubmark -- shellsort --size 512
//!   cargo run --bin ubmark -- null-xcel --backend mmio --window /dev/uio0
//!   cargo run --bin ubmark -- --file ubmark-vvadd-fileio.dat
//!
//! `TINYRV_SIZE` and `TINYRV_BACKEND` set the defaults the flags override.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tinyrv_bench::{run_benchmark, run_vvadd_fileio, BenchReport, Benchmark, RunConfig};
use tinyrv_runtime::{BackendSelection, LogReporter};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    println!("TinyRV micro-benchmarks");
    println!("=======================");

    let mut reports = Vec::new();

    if let Some(path) = args
        .windows(2)
        .find(|w| w[0] == "--file")
        .map(|w| PathBuf::from(&w[1]))
    {
        println!("Dataset        : {}", path.display());
        println!();
        let report = run_vvadd_fileio(&path, &mut LogReporter::default())
            .with_context(|| format!("vvadd on {}", path.display()))?;
        reports.push(report);
    } else {
        let selected = match args.get(1).filter(|a| !a.starts_with("--")) {
            Some(name) => vec![name.parse::<Benchmark>()?],
            None => Benchmark::SINGLE_CORE.to_vec(),
        };

        let mut config = RunConfig::from_env()?;
        config.backend = parse_arg(&args, "--backend", config.backend);
        config.window = parse_arg(&args, "--window", config.window);
        println!("Backend        : {}", backend_name(config.backend));
        println!();

        for bench in selected {
            let mut run = config.clone();
            run.size = Some(parse_arg(
                &args,
                "--size",
                config.size.unwrap_or_else(|| bench.default_size()),
            ));
            let report = run_benchmark(bench, &run, &mut LogReporter::default())
                .with_context(|| format!("{bench} failed to run"))?;
            reports.push(report);
        }
    }

    for report in &reports {
        print_report(report);
    }

    let failed = reports.iter().filter(|r| !r.passed()).count();
    if failed > 0 {
        anyhow::bail!("{failed} benchmark(s) failed");
    }
    Ok(())
}

fn backend_name(selection: BackendSelection) -> &'static str {
    match selection {
        BackendSelection::Auto => "auto",
        BackendSelection::Software => "software",
        BackendSelection::Mmio => "mmio",
    }
}

fn print_report(report: &BenchReport) {
    println!("{report}");
    for (i, verdict) in report.verdicts.iter().enumerate() {
        if !verdict.passed() {
            println!(
                "  output {i}     : {} of {} elements wrong",
                verdict.mismatches.len(),
                verdict.checked
            );
        }
    }
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
