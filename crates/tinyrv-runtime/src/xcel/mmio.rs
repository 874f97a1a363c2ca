//! Memory-mapped accelerator register window
//!
//! Maps the register window of an accelerator exposed through a UIO-style
//! device file (or any file at least one window long) and performs each
//! register transaction as a single volatile 32-bit access.
//!
//! ```text
//! offset  register
//! ──────  ────────────────────────
//! 0x000   xr0   go / result
//! 0x004   xr1   src0
//! 0x008   xr2   src1
//! 0x00c   xr3   dest
//! 0x010   xr4   size
//! 0x080   status (BUSY | DONE)
//! ```

// MMIO registers are naturally aligned by hardware, so pointer casts are safe
#![allow(clippy::cast_ptr_alignment)]

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsFd;
use std::path::Path;

use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use tinyrv_chip::regs::{self, status};
use tracing::{debug, info};

use super::{BackendType, XcelBackend, XcelFunction, XcelReg};
use crate::error::{XcelError, XcelResult};

/// Mapped accelerator register window
pub struct MmioXcel {
    /// Memory-mapped pointer
    ptr: *mut u8,
    /// Size of the mapping
    size: usize,
    /// Function the hardware implements
    function: XcelFunction,
    /// Keeps the mapping's backing file open
    _file: File,
}

impl std::fmt::Debug for MmioXcel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmioXcel")
            .field("ptr", &format_args!("{:p}", self.ptr))
            .field("size", &self.size)
            .field("function", &self.function)
            .finish_non_exhaustive()
    }
}

// SAFETY: Send - MmioXcel owns the mapping exclusively. Moving between threads
// doesn't invalidate the mapping (mmap'd memory is process-wide). No thread-local state.
unsafe impl Send for MmioXcel {}

impl MmioXcel {
    /// Map the register window at `path`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The window cannot be opened read/write
    /// - A regular file is shorter than one window
    /// - Memory mapping the window fails
    pub fn open(path: &Path, function: XcelFunction) -> XcelResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| XcelError::mmio(format!("Failed to open {}: {e}", path.display())))?;

        let meta = file
            .metadata()
            .map_err(|e| XcelError::mmio(format!("Failed to stat {}: {e}", path.display())))?;
        // device files report length 0
        if meta.is_file() && meta.len() < regs::MMIO_WINDOW as u64 {
            return Err(XcelError::mmio(format!(
                "{} is {} bytes, register window needs {}",
                path.display(),
                meta.len(),
                regs::MMIO_WINDOW
            )));
        }

        // SAFETY: mmap necessary for MMIO - maps the register window into process
        // address space. Invariants: (1) file open read/write; (2) window length
        // checked above for regular files, device files define their own size;
        // (3) ptr valid for MMIO_WINDOW bytes or Err.
        let ptr = unsafe {
            mmap(
                std::ptr::null_mut(),
                regs::MMIO_WINDOW,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                file.as_fd(),
                0,
            )
            .map_err(|e| XcelError::mmio(format!("Failed to mmap {}: {e}", path.display())))?
        };

        info!(
            "Mapped xcel window {} at {:p}, size={:#x}",
            path.display(),
            ptr,
            regs::MMIO_WINDOW
        );

        Ok(Self {
            ptr: ptr.cast(),
            size: regs::MMIO_WINDOW,
            function,
            _file: file,
        })
    }

    /// Read a 32-bit word of the window
    ///
    /// # Panics
    ///
    /// Panics if `offset + 4` exceeds the mapped window.
    fn read32(&self, offset: usize) -> u32 {
        assert!(offset + 4 <= self.size, "Register offset out of bounds");
        // SAFETY: read_volatile necessary for MMIO - hardware can change value.
        // Invariants: (1) ptr from mmap in open(), valid for self.size; (2) offset+4 <= size;
        // (3) u32 aligned (register offsets are multiples of 4).
        unsafe { std::ptr::read_volatile(self.ptr.add(offset).cast::<u32>()) }
    }

    /// Write a 32-bit word of the window
    ///
    /// # Panics
    ///
    /// Panics if `offset + 4` exceeds the mapped window.
    fn write32(&self, offset: usize, value: u32) {
        assert!(offset + 4 <= self.size, "Register offset out of bounds");
        // SAFETY: write_volatile necessary for MMIO - triggers hardware side effects.
        // Invariants: (1) ptr from mmap; (2) offset+4 <= size; (3) u32 aligned.
        unsafe {
            std::ptr::write_volatile(self.ptr.add(offset).cast::<u32>(), value);
        }
    }

    /// Current status word
    pub fn status(&self) -> u32 {
        self.read32(regs::MMIO_STATUS)
    }
}

impl XcelBackend for MmioXcel {
    fn write(&mut self, reg: XcelReg, value: u32) -> XcelResult<()> {
        self.write32(regs::mmio_offset(reg.index()), value);
        Ok(())
    }

    fn go(&mut self) -> XcelResult<()> {
        if self.status() & status::BUSY != 0 {
            return Err(XcelError::mmio("accelerator busy at go"));
        }
        // the null accelerator starts on its xr0 data write
        if !self.function.data_in_xr0() {
            self.write32(regs::mmio_offset(regs::XR_GO), 0);
        }
        Ok(())
    }

    fn wait(&mut self) -> XcelResult<u32> {
        // No timeout: a transaction that never completes hangs the core.
        while self.status() & status::DONE == 0 {
            std::hint::spin_loop();
        }
        Ok(self.read32(regs::mmio_offset(regs::XR_GO)))
    }

    fn function(&self) -> XcelFunction {
        self.function
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Mmio
    }
}

impl Drop for MmioXcel {
    fn drop(&mut self) {
        // SAFETY: munmap necessary - must unmap region before the file closes.
        // Invariants: (1) ptr from mmap in open(), valid for self.size; (2) Drop
        // runs at most once; (3) no outstanding references into the window.
        unsafe {
            let _ = munmap(self.ptr.cast(), self.size);
        }
        debug!("Unmapped xcel window");
    }
}
