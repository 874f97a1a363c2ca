//! Accelerator dispatch protocol.
//!
//! The register file is only reachable through [`Xcel`], which walks an
//! explicit state machine:
//!
//! ```text
//!            configure           trigger            complete_read
//!   Idle ──────────────▶ Loading ───────▶ Triggered ─────────────▶ Done ──▶ Idle
//!              ▲    │ configure
//!              │    └──┐
//!              └───────┘
//! ```
//!
//! From `trigger` until `complete_read` returns the accelerator owns every
//! memory region named by its operand registers. `complete_read` is the
//! completion signal and the barrier at once; there is no separate poll or
//! interrupt. Only one transaction can be outstanding, which `&mut self`
//! enforces.
//!
//! # Backends
//!
//! ```text
//! SoftwareXcel  — device thread over a flat Memory (CI, benchmarks)
//! MmioXcel      — memory-mapped register window (hardware)
//! ```

pub mod mmio;
pub mod software;

use std::fmt::Debug;
use std::path::Path;

use tinyrv_chip::regs;
use tracing::{debug, info};

use crate::error::{XcelError, XcelResult};
use crate::memory::Memory;

pub use mmio::MmioXcel;
pub use software::{SoftwareXcel, DEFAULT_MEMORY_BYTES};

/// Accelerator registers reachable from the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XcelReg {
    /// Go / status (xr0). Written by `trigger`, read by `complete_read`.
    /// The null accelerator's data register.
    Go,
    /// First operand base address (xr1).
    Src0,
    /// Second operand base address (xr2).
    Src1,
    /// Destination base address (xr3).
    Dest,
    /// Element count (xr4).
    Size,
}

impl XcelReg {
    /// Registers writable through `configure`.
    pub const OPERANDS: [Self; 4] = [Self::Src0, Self::Src1, Self::Dest, Self::Size];

    /// Architectural register index.
    pub const fn index(self) -> u8 {
        match self {
            Self::Go => regs::XR_GO,
            Self::Src0 => regs::XR_SRC0,
            Self::Src1 => regs::XR_SRC1,
            Self::Dest => regs::XR_DEST,
            Self::Size => regs::XR_SIZE,
        }
    }

    const fn bit(self) -> u32 {
        1 << self.index()
    }
}

/// Protocol state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XcelState {
    /// No transaction in progress.
    Idle,
    /// At least one operand register written.
    Loading,
    /// Go issued; the accelerator owns its operand memory.
    Triggered,
    /// Completion read returned; about to become idle.
    Done,
}

/// Function the accelerator hardware implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XcelFunction {
    /// Echoes the word written to xr0 back through the completion read.
    Null,
    /// `dest[i] = src0[i] + src1[i]` for `i < size`.
    Vvadd,
}

impl XcelFunction {
    /// Registers that must be configured before `trigger`.
    pub const fn required(self) -> &'static [XcelReg] {
        match self {
            Self::Null => &[XcelReg::Go],
            Self::Vvadd => &XcelReg::OPERANDS,
        }
    }

    /// Whether xr0 carries the operand. Go then leaves xr0 as configured
    /// instead of clearing it.
    pub const fn data_in_xr0(self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether `configure` may write `reg`.
    pub const fn accepts(self, reg: XcelReg) -> bool {
        !matches!(reg, XcelReg::Go) || self.data_in_xr0()
    }

    /// Whether the function reads and writes operand memory.
    pub const fn needs_memory(self) -> bool {
        matches!(self, Self::Vvadd)
    }

    /// Short name used on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Vvadd => "vvadd",
        }
    }
}

/// Backend type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Software accelerator on a device thread
    Software,
    /// Memory-mapped register window
    Mmio,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Software => write!(f, "Software (virtual xcel)"),
            Self::Mmio => write!(f, "MMIO"),
        }
    }
}

/// Backend selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendSelection {
    /// MMIO if the register window exists, software otherwise
    Auto,
    /// Force the software accelerator
    Software,
    /// Force the memory-mapped register window
    Mmio,
}

impl std::str::FromStr for BackendSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "software" | "sw" => Ok(Self::Software),
            "mmio" => Ok(Self::Mmio),
            other => Err(format!("unknown backend '{other}' (auto | software | mmio)")),
        }
    }
}

/// Raw register-file transactions, one per `custom0` instruction.
///
/// Only [`Xcel`] calls these; it owns the protocol state.
pub trait XcelBackend: Debug + Send {
    /// Write one register.
    ///
    /// # Errors
    ///
    /// Returns error if the register file is unreachable.
    fn write(&mut self, reg: XcelReg, value: u32) -> XcelResult<()>;

    /// Issue the go write. Functions with [`XcelFunction::data_in_xr0`]
    /// keep the configured xr0 word.
    ///
    /// # Errors
    ///
    /// Returns error if the accelerator cannot be started.
    fn go(&mut self) -> XcelResult<()>;

    /// Blocking read of xr0. Returns once the accelerator is done.
    ///
    /// # Errors
    ///
    /// Returns error if the device is lost or the operation faulted.
    fn wait(&mut self) -> XcelResult<u32>;

    /// Function implemented by this accelerator.
    fn function(&self) -> XcelFunction;

    /// Host view of accelerator memory, if the backend has one.
    fn memory_mut(&mut self) -> Option<&mut Memory> {
        None
    }

    /// Whether the backend shares operand memory with the host.
    fn has_memory(&self) -> bool {
        false
    }

    /// Backend type for debugging
    fn backend_type(&self) -> BackendType;
}

impl XcelBackend for Box<dyn XcelBackend> {
    fn write(&mut self, reg: XcelReg, value: u32) -> XcelResult<()> {
        (**self).write(reg, value)
    }

    fn go(&mut self) -> XcelResult<()> {
        (**self).go()
    }

    fn wait(&mut self) -> XcelResult<u32> {
        (**self).wait()
    }

    fn function(&self) -> XcelFunction {
        (**self).function()
    }

    fn memory_mut(&mut self) -> Option<&mut Memory> {
        (**self).memory_mut()
    }

    fn has_memory(&self) -> bool {
        (**self).has_memory()
    }

    fn backend_type(&self) -> BackendType {
        (**self).backend_type()
    }
}

/// Select a backend for `function`.
///
/// `window` is the register window device (e.g. `/dev/uio0`), used by the
/// MMIO backend. The register window carries no operand memory, so
/// functions that need memory never run over MMIO; `Auto` picks the
/// software accelerator for them.
///
/// # Errors
///
/// - [`XcelError::UnsupportedBackend`] for MMIO with a memory function
/// - any error initializing the selected backend
pub fn select_backend(
    selection: BackendSelection,
    function: XcelFunction,
    window: &Path,
) -> XcelResult<Box<dyn XcelBackend>> {
    match selection {
        BackendSelection::Auto => {
            if function.needs_memory() {
                info!("{} xcel needs operand memory, using software xcel", function.name());
            } else if window.exists() {
                if let Ok(backend) = MmioXcel::open(window, function) {
                    info!("Using MMIO xcel at {}", window.display());
                    return Ok(Box::new(backend));
                }
                info!("Register window {} unusable, using software xcel", window.display());
            } else {
                info!("No register window at {}, using software xcel", window.display());
            }
            SoftwareXcel::new(function, DEFAULT_MEMORY_BYTES)
                .map(|b| Box::new(b) as Box<dyn XcelBackend>)
        }

        BackendSelection::Software => SoftwareXcel::new(function, DEFAULT_MEMORY_BYTES)
            .map(|b| Box::new(b) as Box<dyn XcelBackend>),

        BackendSelection::Mmio if function.needs_memory() => Err(XcelError::UnsupportedBackend {
            function: function.name(),
            backend: BackendType::Mmio,
        }),

        BackendSelection::Mmio => {
            MmioXcel::open(window, function).map(|b| Box::new(b) as Box<dyn XcelBackend>)
        }
    }
}

/// The accelerator, reachable only through configure / trigger / complete_read.
#[derive(Debug)]
pub struct Xcel<B: XcelBackend> {
    backend: B,
    state: XcelState,
    /// Bit `xr` set once register `xr` has been configured.
    configured: u32,
}

impl<B: XcelBackend> Xcel<B> {
    /// Wrap a backend. The accelerator starts idle.
    pub const fn new(backend: B) -> Self {
        Self {
            backend,
            state: XcelState::Idle,
            configured: 0,
        }
    }

    /// Current protocol state.
    pub const fn state(&self) -> XcelState {
        self.state
    }

    /// Backend in use.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Write one operand register.
    ///
    /// # Errors
    ///
    /// - [`XcelError::ReservedRegister`] for [`XcelReg::Go`], unless the
    ///   backend is the null accelerator
    /// - [`XcelError::ProtocolViolation`] unless idle or loading
    pub fn configure(&mut self, reg: XcelReg, value: u32) -> XcelResult<()> {
        if !self.backend.function().accepts(reg) {
            return Err(XcelError::ReservedRegister { xr: reg.index() });
        }
        if !matches!(self.state, XcelState::Idle | XcelState::Loading) {
            return Err(XcelError::violation("configure", self.state));
        }

        self.backend.write(reg, value)?;
        self.configured |= reg.bit();
        self.state = XcelState::Loading;
        debug!(
            "custom0 0, {value:#010x}, xr{}, {}",
            reg.index(),
            regs::funct::WRITE
        );
        Ok(())
    }

    /// Start the accelerator.
    ///
    /// # Errors
    ///
    /// - [`XcelError::ProtocolViolation`] unless loading
    /// - [`XcelError::MissingRegister`] if a required operand is unset
    pub fn trigger(&mut self) -> XcelResult<()> {
        if self.state != XcelState::Loading {
            return Err(XcelError::violation("trigger", self.state));
        }
        if let Some(reg) = self
            .backend
            .function()
            .required()
            .iter()
            .find(|reg| self.configured & reg.bit() == 0)
        {
            return Err(XcelError::MissingRegister { xr: reg.index() });
        }

        self.backend.go()?;
        self.state = XcelState::Triggered;
        let function = self.backend.function();
        if function.data_in_xr0() {
            debug!("{} go on the xr{} write", function.name(), regs::XR_GO);
        } else {
            debug!(
                "custom0 0, 0, xr{}, {} ({} go)",
                regs::XR_GO,
                regs::funct::WRITE,
                function.name()
            );
        }
        Ok(())
    }

    /// Block until the accelerator is done and return the xr0 word.
    ///
    /// # Errors
    ///
    /// - [`XcelError::ProtocolViolation`] unless triggered
    /// - backend errors if the device faults; the accelerator is idle
    ///   again afterwards
    pub fn complete_read(&mut self) -> XcelResult<u32> {
        if self.state != XcelState::Triggered {
            return Err(XcelError::violation("complete_read", self.state));
        }

        // the transaction is over once the read returns, faulted or not
        let outcome = self.backend.wait();
        self.state = XcelState::Done;
        match &outcome {
            Ok(value) => debug!(
                "custom0 {value:#010x}, 0, xr{}, {}",
                regs::XR_GO,
                regs::funct::READ
            ),
            Err(e) => debug!("xcel faulted: {e}"),
        }

        self.state = XcelState::Idle;
        self.configured = 0;
        outcome
    }

    /// Configure every register in `operands`, trigger, and wait.
    ///
    /// # Errors
    ///
    /// Returns the first protocol or backend error.
    pub fn transaction(&mut self, operands: &[(XcelReg, u32)]) -> XcelResult<u32> {
        for &(reg, value) in operands {
            self.configure(reg, value)?;
        }
        self.trigger()?;
        self.complete_read()
    }

    /// Host access to accelerator memory. Only while idle.
    ///
    /// # Errors
    ///
    /// - [`XcelError::ProtocolViolation`] unless idle
    /// - [`XcelError::NoHostMemory`] if the backend has no host view
    pub fn memory_mut(&mut self) -> XcelResult<&mut Memory> {
        if self.state != XcelState::Idle {
            return Err(XcelError::violation("host memory access", self.state));
        }
        let backend = self.backend.backend_type();
        self.backend
            .memory_mut()
            .ok_or_else(|| XcelError::NoHostMemory {
                backend: backend.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn null_xcel() -> Xcel<SoftwareXcel> {
        Xcel::new(SoftwareXcel::new(XcelFunction::Null, 64).unwrap())
    }

    #[test]
    fn register_indices_match_chip() {
        assert_eq!(XcelReg::Go.index(), 0);
        assert_eq!(XcelReg::Src0.index(), 1);
        assert_eq!(XcelReg::Size.index(), 4);
    }

    #[test]
    fn full_cycle_returns_to_idle() {
        let mut xcel = null_xcel();
        assert_eq!(xcel.state(), XcelState::Idle);
        xcel.configure(XcelReg::Go, 0xdead_beef).unwrap();
        assert_eq!(xcel.state(), XcelState::Loading);
        xcel.trigger().unwrap();
        assert_eq!(xcel.state(), XcelState::Triggered);
        assert_eq!(xcel.complete_read().unwrap(), 0xdead_beef);
        assert_eq!(xcel.state(), XcelState::Idle);
    }

    #[test]
    fn read_before_trigger_is_violation() {
        let mut xcel = null_xcel();
        assert!(matches!(
            xcel.complete_read(),
            Err(XcelError::ProtocolViolation { op: "complete_read", state: XcelState::Idle })
        ));
        xcel.configure(XcelReg::Go, 1).unwrap();
        assert!(matches!(
            xcel.complete_read(),
            Err(XcelError::ProtocolViolation { state: XcelState::Loading, .. })
        ));
    }

    #[test]
    fn trigger_without_configure_is_violation() {
        let mut xcel = null_xcel();
        assert!(matches!(
            xcel.trigger(),
            Err(XcelError::ProtocolViolation { op: "trigger", state: XcelState::Idle })
        ));
    }

    #[test]
    fn second_transaction_before_completion_is_violation() {
        let mut xcel = null_xcel();
        xcel.configure(XcelReg::Go, 7).unwrap();
        xcel.trigger().unwrap();
        assert!(matches!(
            xcel.configure(XcelReg::Go, 8),
            Err(XcelError::ProtocolViolation { op: "configure", state: XcelState::Triggered })
        ));
        assert!(matches!(
            xcel.trigger(),
            Err(XcelError::ProtocolViolation { state: XcelState::Triggered, .. })
        ));
        assert!(matches!(
            xcel.memory_mut(),
            Err(XcelError::ProtocolViolation { state: XcelState::Triggered, .. })
        ));
        assert_eq!(xcel.complete_read().unwrap(), 7);
    }

    #[test]
    fn go_is_reserved_for_vvadd() {
        let mut xcel = Xcel::new(SoftwareXcel::new(XcelFunction::Vvadd, 64).unwrap());
        assert!(matches!(
            xcel.configure(XcelReg::Go, 0),
            Err(XcelError::ReservedRegister { xr: 0 })
        ));
        assert_eq!(xcel.state(), XcelState::Idle);
    }

    #[test]
    fn null_takes_its_operand_in_xr0() {
        assert!(XcelFunction::Null.accepts(XcelReg::Go));
        assert!(!XcelFunction::Vvadd.accepts(XcelReg::Go));
        assert_eq!(XcelFunction::Null.required(), &[XcelReg::Go]);
    }

    #[test]
    fn missing_operand_blocks_trigger() {
        let mut xcel = Xcel::new(SoftwareXcel::new(XcelFunction::Vvadd, 64).unwrap());
        xcel.configure(XcelReg::Src0, 0).unwrap();
        xcel.configure(XcelReg::Src1, 16).unwrap();
        xcel.configure(XcelReg::Size, 4).unwrap();
        assert!(matches!(xcel.trigger(), Err(XcelError::MissingRegister { xr: 3 })));
        assert_eq!(xcel.state(), XcelState::Loading);
    }

    #[test]
    fn configured_set_resets_between_transactions() {
        let mut xcel = null_xcel();
        assert_eq!(xcel.transaction(&[(XcelReg::Go, 3)]).unwrap(), 3);
        // xr0 must be written again for the next transaction
        xcel.configure(XcelReg::Size, 0).unwrap();
        assert!(matches!(xcel.trigger(), Err(XcelError::MissingRegister { xr: 0 })));
    }

    #[test]
    fn boxed_backend_dispatches() {
        let backend =
            select_backend(BackendSelection::Software, XcelFunction::Null, Path::new("/nonexistent"))
                .unwrap();
        assert_eq!(backend.backend_type(), BackendType::Software);
        let mut xcel = Xcel::new(backend);
        assert_eq!(xcel.transaction(&[(XcelReg::Go, 11)]).unwrap(), 11);
    }

    #[test]
    fn memory_functions_never_select_mmio() {
        let window = tempfile::NamedTempFile::new().unwrap();
        window.as_file().set_len(regs::MMIO_WINDOW as u64).unwrap();

        let auto =
            select_backend(BackendSelection::Auto, XcelFunction::Vvadd, window.path()).unwrap();
        assert_eq!(auto.backend_type(), BackendType::Software);

        assert!(matches!(
            select_backend(BackendSelection::Mmio, XcelFunction::Vvadd, window.path()),
            Err(XcelError::UnsupportedBackend { function: "vvadd", backend: BackendType::Mmio })
        ));

        let null =
            select_backend(BackendSelection::Auto, XcelFunction::Null, window.path()).unwrap();
        assert_eq!(null.backend_type(), BackendType::Mmio);
    }

    #[test]
    fn auto_falls_back_to_software() {
        let backend =
            select_backend(BackendSelection::Auto, XcelFunction::Vvadd, Path::new("/nonexistent/uio"))
                .unwrap();
        assert_eq!(backend.backend_type(), BackendType::Software);
    }

    #[test]
    fn backend_names_parse() {
        assert_eq!("mmio".parse::<BackendSelection>(), Ok(BackendSelection::Mmio));
        assert_eq!("sw".parse::<BackendSelection>(), Ok(BackendSelection::Software));
        assert!("gpu".parse::<BackendSelection>().is_err());
    }
}
