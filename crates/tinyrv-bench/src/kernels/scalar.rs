//! Single-core kernels.

/// Gap sequence for [`shellsort`], largest first.
pub const SHELLSORT_GAPS: [usize; 4] = [40, 13, 4, 1];

/// `dest[i] = src0[i] + src1[i]`, wrapping.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn vvadd_scalar(dest: &mut [i32], src0: &[i32], src1: &[i32]) {
    assert!(src0.len() == dest.len() && src1.len() == dest.len());
    for ((d, &a), &b) in dest.iter_mut().zip(src0).zip(src1) {
        *d = a.wrapping_add(b);
    }
}

/// `c = a × b` for row-major `n × n` matrices, wrapping.
///
/// # Panics
///
/// Panics if any matrix is not `n * n` elements.
pub fn matmul_scalar(n: usize, c: &mut [i32], a: &[i32], b: &[i32]) {
    assert!(c.len() == n * n && a.len() == n * n && b.len() == n * n);
    for i in 0..n {
        for j in 0..n {
            let mut acc = 0i32;
            for k in 0..n {
                acc = acc.wrapping_add(a[i * n + k].wrapping_mul(b[k * n + j]));
            }
            c[i * n + j] = acc;
        }
    }
}

/// Unsigned `dest[i] = src0[i] / src1[i]`.
///
/// Division by zero yields all ones, as `divu` does.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn vvdiv_scalar(dest: &mut [u32], src0: &[u32], src1: &[u32]) {
    assert!(src0.len() == dest.len() && src1.len() == dest.len());
    for ((d, &a), &b) in dest.iter_mut().zip(src0).zip(src1) {
        *d = a.checked_div(b).unwrap_or(u32::MAX);
    }
}

/// Unsigned `dest[i] = src0[i] % src1[i]`.
///
/// Remainder by zero yields the dividend, as `remu` does.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn vvrem_scalar(dest: &mut [u32], src0: &[u32], src1: &[u32]) {
    assert!(src0.len() == dest.len() && src1.len() == dest.len());
    for ((d, &a), &b) in dest.iter_mut().zip(src0).zip(src1) {
        *d = a.checked_rem(b).unwrap_or(a);
    }
}

/// Copy `src` into `dest` and sort it ascending with Shell's method.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn shellsort(dest: &mut [i32], src: &[i32]) {
    dest.copy_from_slice(src);
    let size = dest.len();

    for &gap in SHELLSORT_GAPS.iter().filter(|&&g| g < size) {
        for i in gap..size {
            let swap = dest[i];
            let mut j = i;
            while j >= gap && dest[j - gap] > swap {
                dest[j] = dest[j - gap];
                j -= gap;
            }
            dest[j] = swap;
        }
    }
}
