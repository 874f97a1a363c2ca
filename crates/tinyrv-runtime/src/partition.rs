//! Static work partitioning.
//!
//! Splits a 1-D index domain (or the row domain of a 2-D one) into one
//! half-open range per core. The ranges of a partition are ordered,
//! pairwise disjoint, contiguous, and cover `[0, size)` exactly once.
//! Kernels rely on nothing else for freedom from data races.
//!
//! Two remainder policies are in use:
//!
//! ```text
//! size = 10, cores = 4, block = 10 >> 2 = 2
//!
//! EvenSplitWithTail    [0,2) [2,4) [4,6) [6,10)     tail absorbs 4
//! BalancedRemainder    [0,2) [2,4) [4,7) [7,10)     remainder 2, idx 2
//! ```

use std::fmt;
use std::ops::Range;

use tinyrv_chip::cores;
use tracing::warn;

use crate::topology::CoreId;

/// Rule for distributing the elements left over after even division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    /// Every core but the last gets `size >> log2(n)` elements; the last
    /// core runs to the end of the domain. Splits on 2, 4, 8 or 16 cores.
    EvenSplitWithTail,

    /// Cores from `idx = n - remainder` on get one extra row, so no two
    /// ranges differ in length by more than one. Splits on any supported
    /// core count.
    BalancedRemainder,
}

impl Policy {
    /// Both policies.
    pub const ALL: [Self; 2] = [Self::EvenSplitWithTail, Self::BalancedRemainder];

    /// Whether this policy splits work across `num_cores` cores.
    pub fn supports(self, num_cores: usize) -> bool {
        match self {
            Self::EvenSplitWithTail => num_cores == 1 || cores::EVEN_SPLIT.contains(&num_cores),
            Self::BalancedRemainder => cores::is_supported(num_cores),
        }
    }

    /// Short name used on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Self::EvenSplitWithTail => "tail",
            Self::BalancedRemainder => "balanced",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl std::str::FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "tail" | "even-split-with-tail" => Ok(Self::EvenSplitWithTail),
            "balanced" | "balanced-remainder" => Ok(Self::BalancedRemainder),
            other => Err(format!("unknown partition policy '{other}' (tail | balanced)")),
        }
    }
}

/// Half-open index interval `[begin, end)` owned by exactly one core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkRange {
    /// First index.
    pub begin: usize,
    /// One past the last index.
    pub end: usize,
}

impl WorkRange {
    /// Create a range. `begin` must not exceed `end`.
    pub const fn new(begin: usize, end: usize) -> Self {
        debug_assert!(begin <= end);
        Self { begin, end }
    }

    /// Number of indices in the range.
    pub const fn len(&self) -> usize {
        self.end - self.begin
    }

    /// Whether the range is empty.
    pub const fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// As a standard range, for slicing and iteration.
    pub const fn as_range(&self) -> Range<usize> {
        self.begin..self.end
    }
}

impl fmt::Display for WorkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{})", self.begin, self.end)
    }
}

/// The ranges computed for one (size, cores, policy) triple, indexed by core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    policy: Policy,
    ranges: Vec<WorkRange>,
    fallback: bool,
}

/// Split `[0, domain_size)` across `num_cores` cores.
///
/// Always returns `max(num_cores, 1)` ranges. When the policy does not
/// split across `num_cores`, core 0 gets the whole domain and every other
/// core an empty range at the end; the partition is flagged with
/// [`Partition::is_fallback`].
pub fn partition(domain_size: usize, num_cores: usize, policy: Policy) -> Partition {
    let n = num_cores.max(1);

    let shift = match cores::shift(n) {
        Some(shift) if policy.supports(num_cores) => shift,
        _ => {
            warn!(
                "{policy} partition does not split across {num_cores} cores; \
                 core 0 takes all {domain_size} elements"
            );
            return Partition::single_core(domain_size, n, policy);
        }
    };

    let block = domain_size >> shift;

    let ranges = match policy {
        Policy::EvenSplitWithTail => (0..n)
            .map(|i| {
                let begin = i * block;
                let end = if i == n - 1 { domain_size } else { begin + block };
                WorkRange::new(begin, end)
            })
            .collect(),

        Policy::BalancedRemainder => {
            let remainder = domain_size - (block << shift);
            // cores from idx on take one extra row
            let idx = n - remainder;
            let mut current = 0;
            (0..n)
                .map(|i| {
                    let end = current + block + usize::from(i >= idx);
                    let range = WorkRange::new(current, end);
                    current = end;
                    range
                })
                .collect()
        }
    };

    Partition {
        policy,
        ranges,
        fallback: false,
    }
}

impl Partition {
    fn single_core(domain_size: usize, num_cores: usize, policy: Policy) -> Self {
        let ranges = std::iter::once(WorkRange::new(0, domain_size))
            .chain(std::iter::repeat(WorkRange::new(domain_size, domain_size)).take(num_cores - 1))
            .collect();
        Self {
            policy,
            ranges,
            fallback: true,
        }
    }

    /// Policy that produced this partition.
    pub const fn policy(&self) -> Policy {
        self.policy
    }

    /// Whether the single-core fallback was taken.
    pub const fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Number of ranges (one per core).
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Always false; a partition has at least one range.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Size of the partitioned domain.
    pub fn domain_size(&self) -> usize {
        self.ranges.last().map_or(0, |r| r.end)
    }

    /// Range assigned to `core`, if the core is part of the partition.
    pub fn range(&self, core: CoreId) -> Option<WorkRange> {
        self.ranges.get(core.index()).copied()
    }

    /// Ranges in core order.
    pub fn ranges(&self) -> &[WorkRange] {
        &self.ranges
    }

    /// `(core, range)` pairs in core order.
    pub fn iter(&self) -> impl Iterator<Item = (CoreId, WorkRange)> + '_ {
        self.ranges
            .iter()
            .enumerate()
            .map(|(i, r)| (CoreId::new(i), *r))
    }

    /// Largest difference in length between any two ranges.
    pub fn max_imbalance(&self) -> usize {
        let lens = self.ranges.iter().map(WorkRange::len);
        let max = lens.clone().max().unwrap_or(0);
        let min = lens.min().unwrap_or(0);
        max - min
    }

    /// Hand out one exclusive sub-slice of `data` per range.
    ///
    /// `stride` is the number of elements per domain index: 1 for vectors,
    /// the row length for row-partitioned matrices.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != domain_size() * stride`.
    pub fn split_mut<'a, T>(&self, data: &'a mut [T], stride: usize) -> Vec<&'a mut [T]> {
        assert_eq!(
            data.len(),
            self.domain_size() * stride,
            "slice does not match partitioned domain"
        );
        let mut rest = data;
        let mut chunks = Vec::with_capacity(self.ranges.len());
        for range in &self.ranges {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(range.len() * stride);
            chunks.push(head);
            rest = tail;
        }
        chunks
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{range}")?;
        }
        Ok(())
    }
}
