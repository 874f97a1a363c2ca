//! Error types for TinyRV runtime operations

use thiserror::Error;

use crate::xcel::{BackendType, XcelState};

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Result type alias for accelerator operations
pub type XcelResult<T> = std::result::Result<T, XcelError>;

/// Errors raised by the topology query and the bare thread runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Core count the tile cannot be built with
    #[error("Unsupported core count {count} (supported: 1, 2, 4, 8, 16, 32, 64)")]
    UnsupportedCoreCount {
        /// Requested core count
        count: usize,
    },

    /// Core id outside the topology
    #[error("Core {core} out of range (have {count} cores)")]
    CoreOutOfRange {
        /// Requested core
        core: usize,
        /// Number of cores in the topology
        count: usize,
    },

    /// Core is already running a job (or is the orchestrator)
    #[error("Core {core} is busy")]
    CoreBusy {
        /// Requested core
        core: usize,
    },

    /// Join issued for a core with no outstanding job
    #[error("Core {core} has no spawned job to join")]
    NotSpawned {
        /// Requested core
        core: usize,
    },

    /// Job panicked while running on its core
    #[error("Job on core {core} panicked: {message}")]
    JobPanicked {
        /// Core the job ran on
        core: usize,
        /// Panic payload, if it was a string
        message: String,
    },

    /// Worker thread for a core is gone
    #[error("Worker for core {core} is no longer running")]
    WorkerLost {
        /// Core whose worker exited
        core: usize,
    },

    /// Accelerator error
    #[error(transparent)]
    Xcel(#[from] XcelError),

    /// Malformed control-port word stream
    #[error("Malformed control stream: {reason}")]
    ControlStream {
        /// Reason for failure
        reason: String,
    },

    /// I/O error while bringing up the runtime
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

/// Errors raised by the accelerator protocol and its backends
#[derive(Debug, Error)]
pub enum XcelError {
    /// Operation not permitted in the current protocol state
    #[error("Accelerator protocol violation: {op} while {state:?}")]
    ProtocolViolation {
        /// Attempted operation
        op: &'static str,
        /// State the accelerator was in
        state: XcelState,
    },

    /// Trigger issued before a required operand was configured
    #[error("Accelerator register xr{xr} must be configured before trigger")]
    MissingRegister {
        /// Register index
        xr: u8,
    },

    /// Register cannot be written through `configure`
    #[error("Accelerator register xr{xr} is reserved")]
    ReservedRegister {
        /// Register index
        xr: u8,
    },

    /// Accelerator memory access outside the backing store
    #[error("Accelerator memory access at {addr:#010x} (+{len} words) out of bounds")]
    OutOfBounds {
        /// Byte address of the access
        addr: u32,
        /// Length in words
        len: usize,
    },

    /// Word access at an address that is not 4-byte aligned
    #[error("Misaligned accelerator memory access at {addr:#010x}")]
    Misaligned {
        /// Byte address of the access
        addr: u32,
    },

    /// Accelerator implements a different function than the caller drives
    #[error("Accelerator implements {found}, expected {expected}")]
    FunctionMismatch {
        /// Function the caller needs
        expected: &'static str,
        /// Function the backend implements
        found: &'static str,
    },

    /// Function cannot run on the chosen backend
    #[error("{function} accelerator needs operand memory, which the {backend} backend lacks")]
    UnsupportedBackend {
        /// Function the caller drives
        function: &'static str,
        /// Backend without operand memory
        backend: BackendType,
    },

    /// Backend has no host-visible memory
    #[error("Backend {backend} exposes no host-visible memory")]
    NoHostMemory {
        /// Backend name
        backend: String,
    },

    /// Device thread or mapping went away mid-transaction
    #[error("Accelerator device lost: {reason}")]
    DeviceLost {
        /// Reason for failure
        reason: String,
    },

    /// Memory-mapped register window could not be set up
    #[error("MMIO error: {reason}")]
    Mmio {
        /// Reason for failure
        reason: String,
    },
}

impl RuntimeError {
    /// Create a job panicked error from a panic payload
    pub fn job_panicked(core: usize, payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::JobPanicked { core, message }
    }

    /// Create a control stream error
    pub fn control_stream(reason: impl Into<String>) -> Self {
        Self::ControlStream {
            reason: reason.into(),
        }
    }
}

impl XcelError {
    /// Create a protocol violation error
    pub const fn violation(op: &'static str, state: XcelState) -> Self {
        Self::ProtocolViolation { op, state }
    }

    /// Create a device lost error
    pub fn device_lost(reason: impl Into<String>) -> Self {
        Self::DeviceLost {
            reason: reason.into(),
        }
    }

    /// Create an MMIO error
    pub fn mmio(reason: impl Into<String>) -> Self {
        Self::Mmio {
            reason: reason.into(),
        }
    }
}
