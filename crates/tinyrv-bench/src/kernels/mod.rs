//! Benchmark kernels.
//!
//! ```text
//! scalar  vvadd, matmul, vvdiv, vvrem, shellsort   one core, plain loops
//! mt      vvadd, matmul                            spawn / join over a partition
//! xcel    vvadd, null                              offloaded to the accelerator
//! ```

pub mod mt;
pub mod scalar;
pub mod xcel;

pub use mt::{matmul_mt, run_matmul_mt, run_vvadd_mt, vvadd_mt, MatmulArg, VvaddArg};
pub use scalar::{matmul_scalar, shellsort, vvadd_scalar, vvdiv_scalar, vvrem_scalar, SHELLSORT_GAPS};
pub use xcel::{null_xcel, vvadd_xcel, XCEL_DEST_SLOT, XCEL_SRC0_SLOT, XCEL_SRC1_SLOT};
