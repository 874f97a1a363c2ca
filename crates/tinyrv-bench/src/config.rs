//! Run configuration.
//!
//! Layered, later sources win:
//!
//! ```text
//! defaults  →  TINYRV_NUM_CORES / TINYRV_SIZE / TINYRV_POLICY / TINYRV_BACKEND  →  flags
//! ```

use std::path::PathBuf;

use tinyrv_runtime::{BackendSelection, Policy, Topology};

use crate::error::{BenchError, Result};

/// Environment variable for the core count.
pub const ENV_NUM_CORES: &str = "TINYRV_NUM_CORES";
/// Environment variable for the problem size.
pub const ENV_SIZE: &str = "TINYRV_SIZE";
/// Environment variable for the partition policy.
pub const ENV_POLICY: &str = "TINYRV_POLICY";
/// Environment variable for the accelerator backend.
pub const ENV_BACKEND: &str = "TINYRV_BACKEND";

/// Default register window for the MMIO backend.
pub const DEFAULT_WINDOW: &str = "/dev/uio0";

/// Everything one benchmark run needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Cores taking part, from the supported set.
    pub num_cores: usize,
    /// Problem size (elements for vector kernels, N for N×N matmul).
    /// `None` uses the benchmark's built-in dataset size.
    pub size: Option<usize>,
    /// Remainder policy. `None` uses the benchmark's own policy.
    pub policy: Option<Policy>,
    /// Accelerator backend.
    pub backend: BackendSelection,
    /// Register window for the MMIO backend.
    pub window: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            num_cores: 4,
            size: None,
            policy: None,
            backend: BackendSelection::Auto,
            window: PathBuf::from(DEFAULT_WINDOW),
        }
    }
}

impl RunConfig {
    /// Defaults overlaid with the process environment.
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but does not parse.
    pub fn from_env() -> Result<Self> {
        Self::default().with_vars(|key| std::env::var(key).ok())
    }

    /// Overlay variables looked up through `var`.
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but does not parse.
    pub fn with_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(v) = var(ENV_NUM_CORES) {
            self.num_cores = v
                .trim()
                .parse()
                .map_err(|e| BenchError::config(format!("{ENV_NUM_CORES}={v}: {e}")))?;
        }
        if let Some(v) = var(ENV_SIZE) {
            self.size = Some(
                v.trim()
                    .parse()
                    .map_err(|e| BenchError::config(format!("{ENV_SIZE}={v}: {e}")))?,
            );
        }
        if let Some(v) = var(ENV_POLICY) {
            self.policy = Some(
                v.trim()
                    .parse()
                    .map_err(|e| BenchError::config(format!("{ENV_POLICY}={v}: {e}")))?,
            );
        }
        if let Some(v) = var(ENV_BACKEND) {
            self.backend = v
                .trim()
                .parse()
                .map_err(|e| BenchError::config(format!("{ENV_BACKEND}={v}: {e}")))?;
        }
        Ok(self)
    }

    /// Validated topology for this run.
    ///
    /// # Errors
    ///
    /// Returns error if `num_cores` is not a supported core count.
    pub fn topology(&self) -> Result<Topology> {
        Ok(Topology::new(self.num_cores)?)
    }
}
