//! Accelerator kernels.
//!
//! vvadd stages its operands in accelerator memory at fixed slots, each
//! `size` words long:
//!
//! ```text
//! slot 0   src0
//! slot 1   src1
//! slot 2   dest
//! ```

use tinyrv_runtime::memory::WORD_BYTES;
use tinyrv_runtime::{Xcel, XcelBackend, XcelError, XcelFunction, XcelReg, XcelResult};
use tracing::debug;

/// Slot holding the first operand.
pub const XCEL_SRC0_SLOT: usize = 0;
/// Slot holding the second operand.
pub const XCEL_SRC1_SLOT: usize = 1;
/// Slot receiving the result.
pub const XCEL_DEST_SLOT: usize = 2;

fn expect_function<B: XcelBackend>(xcel: &Xcel<B>, expected: XcelFunction) -> XcelResult<()> {
    let backend = xcel.backend();
    let found = backend.function();
    if found != expected {
        return Err(XcelError::FunctionMismatch {
            expected: expected.name(),
            found: found.name(),
        });
    }
    if expected.needs_memory() && !backend.has_memory() {
        return Err(XcelError::UnsupportedBackend {
            function: expected.name(),
            backend: backend.backend_type(),
        });
    }
    Ok(())
}

#[allow(clippy::cast_sign_loss)]
fn to_words(values: &[i32]) -> Vec<u32> {
    values.iter().map(|&v| v as u32).collect()
}

/// `dest[i] = src0[i] + src1[i]` on the accelerator.
///
/// # Errors
///
/// Returns error if the accelerator does not implement vvadd, shares no
/// operand memory with the host (the MMIO window), is too small for the
/// three arrays, or faults.
///
/// # Panics
///
/// Panics if the slices differ in length.
#[allow(clippy::cast_possible_wrap)]
pub fn vvadd_xcel<B: XcelBackend>(
    xcel: &mut Xcel<B>,
    dest: &mut [i32],
    src0: &[i32],
    src1: &[i32],
) -> XcelResult<()> {
    assert!(src0.len() == dest.len() && src1.len() == dest.len());
    expect_function(xcel, XcelFunction::Vvadd)?;

    let size = dest.len();
    let too_large = || XcelError::OutOfBounds {
        addr: u32::MAX,
        len: size,
    };
    let slot = |n: usize| {
        size.checked_mul(n * WORD_BYTES as usize)
            .and_then(|bytes| u32::try_from(bytes).ok())
            .ok_or_else(too_large)
    };
    let (src0_addr, src1_addr, dest_addr) =
        (slot(XCEL_SRC0_SLOT)?, slot(XCEL_SRC1_SLOT)?, slot(XCEL_DEST_SLOT)?);
    let size_word = u32::try_from(size).map_err(|_| too_large())?;

    let memory = xcel.memory_mut()?;
    memory.load(src0_addr, &to_words(src0))?;
    memory.load(src1_addr, &to_words(src1))?;
    // a short memory faults here rather than on the device
    memory.words(dest_addr, size)?;

    xcel.transaction(&[
        (XcelReg::Src0, src0_addr),
        (XcelReg::Src1, src1_addr),
        (XcelReg::Dest, dest_addr),
        (XcelReg::Size, size_word),
    ])?;

    let result = xcel.memory_mut()?.words(dest_addr, size)?;
    for (d, &w) in dest.iter_mut().zip(result) {
        *d = w as i32;
    }
    debug!("vvadd_xcel: {size} elements");
    Ok(())
}

/// Round-trip `value` through the null accelerator.
///
/// # Errors
///
/// Returns error if the accelerator is not the null accelerator or the
/// transaction fails.
pub fn null_xcel<B: XcelBackend>(xcel: &mut Xcel<B>, value: u32) -> XcelResult<u32> {
    expect_function(xcel, XcelFunction::Null)?;
    xcel.transaction(&[(XcelReg::Go, value)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinyrv_runtime::SoftwareXcel;

    fn xcel(function: XcelFunction, bytes: usize) -> Xcel<SoftwareXcel> {
        Xcel::new(SoftwareXcel::new(function, bytes).unwrap())
    }

    #[test]
    fn null_echoes() {
        let mut x = xcel(XcelFunction::Null, 0);
        assert_eq!(null_xcel(&mut x, 0xdead_beef).unwrap(), 0xdead_beef);
    }

    #[test]
    fn vvadd_negative_values() {
        let mut x = xcel(XcelFunction::Vvadd, 1024);
        let mut dest = [0; 3];
        vvadd_xcel(&mut x, &mut dest, &[-1, -2, 3], &[1, -2, -5]).unwrap();
        assert_eq!(dest, [0, -4, -2]);
    }

    #[test]
    fn wrong_function_rejected() {
        let mut x = xcel(XcelFunction::Null, 1024);
        assert!(matches!(
            vvadd_xcel(&mut x, &mut [0], &[1], &[2]),
            Err(XcelError::FunctionMismatch { expected: "vvadd", found: "null" })
        ));
        let mut v = xcel(XcelFunction::Vvadd, 0);
        assert!(null_xcel(&mut v, 1).is_err());
    }

    #[test]
    fn memory_too_small() {
        let mut x = xcel(XcelFunction::Vvadd, 16);
        let mut dest = [0; 2];
        assert!(matches!(
            vvadd_xcel(&mut x, &mut dest, &[1, 2], &[3, 4]),
            Err(XcelError::OutOfBounds { .. })
        ));
        assert_eq!(x.state(), tinyrv_runtime::XcelState::Idle);
    }
}
