//! Multi-core kernels.
//!
//! Each kernel runs on one core's [`WorkRange`]. Core `i` receives an
//! argument record holding shared views of the inputs and an exclusive
//! view of its own slice of the output, so two cores can never write the
//! same element.

use tinyrv_runtime::{partition, BareThreads, Partition, Policy, Result, WorkRange};

/// Arguments for one core running [`vvadd_mt`].
#[derive(Debug)]
pub struct VvaddArg<'a> {
    /// This core's share of the output, `range.len()` elements.
    pub dest: &'a mut [i32],
    /// First operand, whole array.
    pub src0: &'a [i32],
    /// Second operand, whole array.
    pub src1: &'a [i32],
    /// Elements this core computes.
    pub range: WorkRange,
}

/// `dest[i] = src0[i] + src1[i]` over one core's range.
pub fn vvadd_mt(arg: VvaddArg<'_>) {
    let VvaddArg {
        dest,
        src0,
        src1,
        range,
    } = arg;
    for (d, i) in dest.iter_mut().zip(range.as_range()) {
        *d = src0[i].wrapping_add(src1[i]);
    }
}

/// Run [`vvadd_mt`] on every core of `threads`.
///
/// # Errors
///
/// Returns error if a spawn or join fails.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn run_vvadd_mt(
    threads: &mut BareThreads,
    dest: &mut [i32],
    src0: &[i32],
    src1: &[i32],
    policy: Policy,
) -> Result<Partition> {
    assert!(src0.len() == dest.len() && src1.len() == dest.len());

    let part = partition(dest.len(), threads.num_cores(), policy);
    let args: Vec<_> = part
        .split_mut(dest, 1)
        .into_iter()
        .zip(part.ranges())
        .map(|(dest, &range)| VvaddArg {
            dest,
            src0,
            src1,
            range,
        })
        .collect();

    threads.run(|scope| scope.fork_join(args, vvadd_mt))?;
    Ok(part)
}

/// Arguments for one core running [`matmul_mt`].
#[derive(Debug)]
pub struct MatmulArg<'a> {
    /// Matrix dimension.
    pub n: usize,
    /// This core's rows of the output, `range.len() * n` elements.
    pub c: &'a mut [i32],
    /// Left operand, whole matrix.
    pub a: &'a [i32],
    /// Right operand, whole matrix.
    pub b: &'a [i32],
    /// Rows this core computes.
    pub range: WorkRange,
}

/// Rows `range` of `c = a × b`.
pub fn matmul_mt(arg: MatmulArg<'_>) {
    let MatmulArg { n, c, a, b, range } = arg;
    for (row, i) in c.chunks_exact_mut(n.max(1)).zip(range.as_range()) {
        for (j, cij) in row.iter_mut().enumerate() {
            *cij = (0..n).fold(0i32, |acc, k| {
                acc.wrapping_add(a[i * n + k].wrapping_mul(b[k * n + j]))
            });
        }
    }
}

/// Run [`matmul_mt`] on every core of `threads`, splitting by rows.
///
/// # Errors
///
/// Returns error if a spawn or join fails.
///
/// # Panics
///
/// Panics if any matrix is not `n * n` elements.
pub fn run_matmul_mt(
    threads: &mut BareThreads,
    n: usize,
    c: &mut [i32],
    a: &[i32],
    b: &[i32],
    policy: Policy,
) -> Result<Partition> {
    assert!(c.len() == n * n && a.len() == n * n && b.len() == n * n);

    let part = partition(n, threads.num_cores(), policy);
    let args: Vec<_> = part
        .split_mut(c, n)
        .into_iter()
        .zip(part.ranges())
        .map(|(c, &range)| MatmulArg { n, c, a, b, range })
        .collect();

    threads.run(|scope| scope.fork_join(args, matmul_mt))?;
    Ok(part)
}
