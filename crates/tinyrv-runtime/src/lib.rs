//! Runtime for TinyRV multi-core micro-benchmarks.
//!
//! Everything a benchmark kernel needs to run across a power-of-two number
//! of cores and to drive the attached accelerator:
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`topology`] | Core count and calling-core identity |
//! | [`partition`] | Static work partitioning (two remainder policies) |
//! | [`bthread`] | Bare spawn / join, one job per core |
//! | [`xcel`] | configure → trigger → blocking read accelerator protocol |
//! | [`report`] | Result verification and pass / fail reporting |
//! | [`stats`] | Statistics region around the measured code |
//!
//! # Quick start
//!
//! ```no_run
//! use tinyrv_runtime::{partition, BareThreads, Policy};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let src0: Vec<i32> = (0..100).collect();
//! let src1: Vec<i32> = (0..100).rev().collect();
//! let mut dest = vec![0i32; 100];
//!
//! let mut threads = BareThreads::with_cores(4)?;
//! let part = partition(dest.len(), threads.num_cores(), Policy::EvenSplitWithTail);
//!
//! let args: Vec<_> = part
//!     .split_mut(&mut dest, 1)
//!     .into_iter()
//!     .zip(part.ranges())
//!     .map(|(out, r)| (out, &src0[r.as_range()], &src1[r.as_range()]))
//!     .collect();
//!
//! threads.run(|scope| {
//!     scope.fork_join(args, |(out, a, b): (&mut [i32], &[i32], &[i32])| {
//!         for ((d, x), y) in out.iter_mut().zip(a).zip(b) {
//!             *d = x + y;
//!         }
//!     })
//! })?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod bthread;
mod error;
pub mod memory;
pub mod partition;
pub mod report;
pub mod stats;
pub mod topology;
pub mod xcel;

pub use bthread::{BareThreads, Scope};
pub use error::{Result, RuntimeError, XcelError, XcelResult};
pub use memory::Memory;
pub use partition::{partition, Partition, Policy, WorkRange};
pub use report::{
    decode_control_words, verify, CollectingReporter, ControlMessage, ControlWordReporter,
    LogReporter, Mismatch, Reporter, Verdict,
};
pub use stats::{stats_on, StatsRegion};
pub use topology::{core_id, current_core, CoreId, Topology};
pub use xcel::{
    select_backend, BackendSelection, BackendType, MmioXcel, SoftwareXcel, Xcel, XcelBackend,
    XcelFunction, XcelReg, XcelState,
};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        core_id, current_core, partition, stats_on, verify, BareThreads, CoreId, LogReporter,
        Policy, Reporter, Result, RuntimeError, Topology, WorkRange, Xcel, XcelFunction, XcelReg,
    };
}
