//! TinyRV micro-benchmark suite.
//!
//! Kernels, datasets and the harness that runs them on top of
//! [`tinyrv_runtime`]:
//!
//! ```text
//! mtbmark   mt-vvadd, mt-matmul                       spawn / join across cores
//! ubmark    vvadd, matmul, vvdivrem, shellsort        core 0 only
//!           vvadd-xcel, null-xcel                     accelerator
//!           vvadd (file input)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use tinyrv_bench::{run_benchmark, Benchmark, RunConfig};
//! use tinyrv_runtime::LogReporter;
//!
//! # fn main() -> tinyrv_bench::Result<()> {
//! let config = RunConfig::from_env()?;
//! let report = run_benchmark(Benchmark::MtVvadd, &config, &mut LogReporter::default())?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod dataset;
mod error;
pub mod harness;
pub mod kernels;

pub use config::RunConfig;
pub use dataset::{DivRemData, Lcg, MatmulData, SortData, VvaddData};
pub use error::{BenchError, Result};
pub use harness::{run_benchmark, run_vvadd_fileio, BenchReport, Benchmark};
