//! Accelerator register file.
//!
//! The accelerator is reached through the `custom0` instruction. Each
//! instruction is a single register transaction; `funct` selects read or
//! write and `rs2` names the accelerator register (`xr0`..`xr31`).
//!
//! ```text
//! custom0  rd, rs1, xr, funct
//!
//! funct = 1   write  xr ← rs1
//! funct = 0   read   rd ← xr      (blocks until the accelerator is done)
//! ```
//!
//! ## vvadd accelerator transaction
//!
//! ```text
//! custom0 0, src0, 1, 1    xr1 ← src0 base address
//! custom0 0, src1, 2, 1    xr2 ← src1 base address
//! custom0 0, dest, 3, 1    xr3 ← dest base address
//! custom0 0, size, 4, 1    xr4 ← element count
//! custom0 0, 0,    0, 1    xr0 ← 0   (go)
//! custom0 0, 0,    0, 0    read xr0  (blocks until done)
//! ```

/// Go / status register. Writing starts the accelerator, reading blocks
/// until it finishes.
pub const XR_GO: u8 = 0;
/// First operand register (`src0` base address).
pub const XR_SRC0: u8 = 1;
/// Second operand register (`src1` base address).
pub const XR_SRC1: u8 = 2;
/// Destination register (`dest` base address).
pub const XR_DEST: u8 = 3;
/// Element-count register.
pub const XR_SIZE: u8 = 4;

/// Number of architecturally visible accelerator registers.
pub const XR_COUNT: usize = 32;

/// Width of one register in the memory-mapped view, in bytes.
pub const XR_STRIDE: usize = 4;

/// Byte offset of a register in the memory-mapped view.
#[must_use]
pub const fn mmio_offset(xr: u8) -> usize {
    xr as usize * XR_STRIDE
}

/// Status word offset in the memory-mapped view (just past the register file).
pub const MMIO_STATUS: usize = XR_COUNT * XR_STRIDE;

/// Size of the memory-mapped register window.
pub const MMIO_WINDOW: usize = 4096;

/// `custom0` function codes.
pub mod funct {
    /// Read an accelerator register.
    pub const READ: u8 = 0;
    /// Write an accelerator register.
    pub const WRITE: u8 = 1;
}

/// Status word bit definitions (memory-mapped view only).
pub mod status {
    /// Accelerator is running a transaction.
    pub const BUSY: u32 = 1 << 0;
    /// Last transaction finished; cleared by the next go.
    pub const DONE: u32 = 1 << 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operand_registers_distinct() {
        let regs = [XR_GO, XR_SRC0, XR_SRC1, XR_DEST, XR_SIZE];
        for (i, a) in regs.iter().enumerate() {
            for b in &regs[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn mmio_layout_fits_window() {
        assert_eq!(mmio_offset(XR_SIZE), 16);
        assert!(MMIO_STATUS + XR_STRIDE <= MMIO_WINDOW);
    }
}
