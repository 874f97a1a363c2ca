//! Benchmark harness.
//!
//! Every benchmark follows the same shape: build the dataset, bring up
//! whatever the kernel runs on, open the stats region, run the kernel,
//! close the region, verify against the reference.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use tinyrv_runtime::{
    select_backend, stats_on, verify, BareThreads, Policy, Reporter, Verdict, Xcel, XcelFunction,
};
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::dataset::{
    DivRemData, MatmulData, SortData, VvaddData, DEFAULT_SEED, FILEIO_CAPACITY,
};
use crate::error::{BenchError, Result};
use crate::kernels;

/// Value the null accelerator benchmark sends through xr0.
pub const NULL_XCEL_PATTERN: u32 = 0xdead_beef;

/// Every benchmark in the suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Benchmark {
    /// Vector-vector add across all cores.
    MtVvadd,
    /// Matrix multiply across all cores, split by rows.
    MtMatmul,
    /// Vector-vector add on core 0.
    Vvadd,
    /// Matrix multiply on core 0.
    Matmul,
    /// Unsigned divide and remainder on core 0.
    Vvdivrem,
    /// Shell sort on core 0.
    Shellsort,
    /// Vector-vector add on the accelerator.
    VvaddXcel,
    /// Register round trip through the null accelerator.
    NullXcel,
}

impl Benchmark {
    /// Multi-core benchmarks.
    pub const MULTI_CORE: [Self; 2] = [Self::MtVvadd, Self::MtMatmul];

    /// Single-core and accelerator benchmarks.
    pub const SINGLE_CORE: [Self; 6] = [
        Self::Vvadd,
        Self::Matmul,
        Self::Vvdivrem,
        Self::Shellsort,
        Self::VvaddXcel,
        Self::NullXcel,
    ];

    /// Every benchmark.
    pub const ALL: [Self; 8] = [
        Self::MtVvadd,
        Self::MtMatmul,
        Self::Vvadd,
        Self::Matmul,
        Self::Vvdivrem,
        Self::Shellsort,
        Self::VvaddXcel,
        Self::NullXcel,
    ];

    /// Name used on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Self::MtVvadd => "mt-vvadd",
            Self::MtMatmul => "mt-matmul",
            Self::Vvadd => "vvadd",
            Self::Matmul => "matmul",
            Self::Vvdivrem => "vvdivrem",
            Self::Shellsort => "shellsort",
            Self::VvaddXcel => "vvadd-xcel",
            Self::NullXcel => "null-xcel",
        }
    }

    /// Whether the benchmark spreads across cores.
    pub const fn is_multi_core(self) -> bool {
        matches!(self, Self::MtVvadd | Self::MtMatmul)
    }

    /// Built-in problem size (elements, or N for N×N matmul).
    pub const fn default_size(self) -> usize {
        match self {
            Self::MtVvadd | Self::Vvadd | Self::VvaddXcel | Self::Vvdivrem => 100,
            Self::MtMatmul | Self::Matmul => 16,
            Self::Shellsort => 128,
            Self::NullXcel => 1,
        }
    }

    /// Partition policy the benchmark uses unless told otherwise.
    pub const fn default_policy(self) -> Policy {
        match self {
            Self::MtMatmul => Policy::BalancedRemainder,
            _ => Policy::EvenSplitWithTail,
        }
    }
}

impl fmt::Display for Benchmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl std::str::FromStr for Benchmark {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        // accept the suite-prefixed program names too
        let name = match s.strip_prefix("mtbmark-") {
            Some(rest) => format!("mt-{rest}"),
            None => s.strip_prefix("ubmark-").unwrap_or(s).to_string(),
        };
        Self::ALL
            .into_iter()
            .find(|b| b.name() == name)
            .ok_or(BenchError::UnknownBenchmark { name })
    }
}

/// Outcome of one benchmark run.
#[derive(Debug, Clone)]
pub struct BenchReport {
    /// Benchmark name.
    pub name: &'static str,
    /// Cores that took part.
    pub num_cores: usize,
    /// Problem size.
    pub size: usize,
    /// Partition the work was split with, for multi-core benchmarks.
    pub partition: Option<String>,
    /// Time inside the stats region.
    pub elapsed: Duration,
    /// One verdict per verified output array.
    pub verdicts: Vec<Verdict>,
}

impl BenchReport {
    /// Whether every output matched its reference.
    pub fn passed(&self) -> bool {
        self.verdicts.iter().all(Verdict::passed)
    }

    /// Number of mismatching elements across all outputs.
    pub fn mismatches(&self) -> usize {
        self.verdicts.iter().map(|v| v.mismatches.len()).sum()
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<12} cores={:<2} size={:<5} {:>8} µs  {}",
            self.name,
            self.num_cores,
            self.size,
            self.elapsed.as_micros(),
            if self.passed() { "[PASSED]" } else { "[FAILED]" }
        )
    }
}

/// Run `bench` with `config`, reporting verification to `reporter`.
///
/// # Errors
///
/// Returns error if the runtime or accelerator cannot be brought up, or a
/// spawn, join or accelerator transaction fails. Wrong results are not an
/// error; they show up in the report.
pub fn run_benchmark(
    bench: Benchmark,
    config: &RunConfig,
    reporter: &mut dyn Reporter,
) -> Result<BenchReport> {
    let size = config.size.unwrap_or_else(|| bench.default_size());
    let policy = config.policy.unwrap_or_else(|| bench.default_policy());
    let mut partition = None;
    let mut num_cores = 1;

    let (elapsed, verdicts) = match bench {
        Benchmark::MtVvadd => {
            let data = VvaddData::generate(size, DEFAULT_SEED);
            let mut threads = BareThreads::new(config.topology()?)?;
            num_cores = threads.num_cores();
            let mut dest = vec![0; size];

            let region = stats_on(bench.name());
            let part =
                kernels::run_vvadd_mt(&mut threads, &mut dest, &data.src0, &data.src1, policy)?;
            let elapsed = region.off();

            partition = Some(part.to_string());
            (elapsed, vec![verify(&dest, &data.reference, reporter)])
        }

        Benchmark::MtMatmul => {
            let data = MatmulData::generate(size, DEFAULT_SEED);
            let mut threads = BareThreads::new(config.topology()?)?;
            num_cores = threads.num_cores();
            let mut c = vec![0; size * size];

            let region = stats_on(bench.name());
            let part = kernels::run_matmul_mt(&mut threads, size, &mut c, &data.a, &data.b, policy)?;
            let elapsed = region.off();

            partition = Some(part.to_string());
            (elapsed, vec![verify(&c, &data.reference, reporter)])
        }

        Benchmark::Vvadd => {
            let data = VvaddData::generate(size, DEFAULT_SEED);
            return Ok(run_vvadd_scalar(&data, reporter));
        }

        Benchmark::Matmul => {
            let data = MatmulData::generate(size, DEFAULT_SEED);
            let mut c = vec![0; size * size];

            let region = stats_on(bench.name());
            kernels::matmul_scalar(size, &mut c, &data.a, &data.b);
            let elapsed = region.off();

            (elapsed, vec![verify(&c, &data.reference, reporter)])
        }

        Benchmark::Vvdivrem => {
            let data = DivRemData::generate(size, DEFAULT_SEED);
            let mut div = vec![0; size];
            let mut rem = vec![0; size];

            let region = stats_on(bench.name());
            kernels::vvdiv_scalar(&mut div, &data.src0, &data.src1);
            kernels::vvrem_scalar(&mut rem, &data.src0, &data.src1);
            let elapsed = region.off();

            (
                elapsed,
                vec![
                    verify(&div, &data.ref_div, reporter),
                    verify(&rem, &data.ref_rem, reporter),
                ],
            )
        }

        Benchmark::Shellsort => {
            let data = SortData::generate(size, DEFAULT_SEED);
            let mut dest = vec![0; size];

            let region = stats_on(bench.name());
            kernels::shellsort(&mut dest, &data.src);
            let elapsed = region.off();

            (elapsed, vec![verify(&dest, &data.reference, reporter)])
        }

        Benchmark::VvaddXcel => {
            let data = VvaddData::generate(size, DEFAULT_SEED);
            let backend = select_backend(config.backend, XcelFunction::Vvadd, &config.window)?;
            let mut xcel = Xcel::new(backend);
            let mut dest = vec![0; size];

            let region = stats_on(bench.name());
            kernels::vvadd_xcel(&mut xcel, &mut dest, &data.src0, &data.src1)?;
            let elapsed = region.off();

            (elapsed, vec![verify(&dest, &data.reference, reporter)])
        }

        Benchmark::NullXcel => {
            let backend = select_backend(config.backend, XcelFunction::Null, &config.window)?;
            let mut xcel = Xcel::new(backend);

            let region = stats_on(bench.name());
            let result = kernels::null_xcel(&mut xcel, NULL_XCEL_PATTERN)?;
            let elapsed = region.off();

            (elapsed, vec![verify(&[result], &[NULL_XCEL_PATTERN], reporter)])
        }
    };

    let report = BenchReport {
        name: bench.name(),
        num_cores,
        size,
        partition,
        elapsed,
        verdicts,
    };
    log_report(&report);
    Ok(report)
}

/// Run the scalar vvadd on a dataset loaded from `path`.
///
/// # Errors
///
/// Returns error if the dataset cannot be read or parsed.
pub fn run_vvadd_fileio(path: &Path, reporter: &mut dyn Reporter) -> Result<BenchReport> {
    let data = VvaddData::load(path, FILEIO_CAPACITY)?;
    info!("Loaded {} elements from {}", data.len(), path.display());
    Ok(run_vvadd_scalar(&data, reporter))
}

fn run_vvadd_scalar(data: &VvaddData, reporter: &mut dyn Reporter) -> BenchReport {
    let mut dest = vec![0; data.len()];

    let region = stats_on(Benchmark::Vvadd.name());
    kernels::vvadd_scalar(&mut dest, &data.src0, &data.src1);
    let elapsed = region.off();

    let report = BenchReport {
        name: Benchmark::Vvadd.name(),
        num_cores: 1,
        size: data.len(),
        partition: None,
        elapsed,
        verdicts: vec![verify(&dest, &data.reference, reporter)],
    };
    log_report(&report);
    report
}

fn log_report(report: &BenchReport) {
    if report.passed() {
        info!("{report}");
    } else {
        warn!("{report} ({} mismatches)", report.mismatches());
    }
    if let Some(part) = &report.partition {
        info!("  partition: {part}");
    }
}
