//! Core-count model.
//!
//! The tile is built with a power-of-two number of identical cores, fixed
//! when the simulator is elaborated. Core 0 boots into `main` and
//! orchestrates; cores `1..N` idle until work is dispatched to them.
//!
//! ```text
//! Configuration   Cores   Shift (log2)
//! ─────────────   ─────   ────────────
//! single              1   0
//! dual                2   1
//! quad                4   2
//! octo                8   3
//! 16-tile            16   4
//! 32-tile            32   5
//! 64-tile            64   6
//! ```

/// Every core count the tile can be built with.
pub const SUPPORTED: [usize; 7] = [1, 2, 4, 8, 16, 32, 64];

/// Largest supported core count.
pub const MAX_CORES: usize = 64;

/// Core that runs `main` and orchestrates spawn / join.
pub const ORCHESTRATOR: usize = 0;

/// Core counts for which the 1-D benchmarks split their arrays.
///
/// Wider tiles run the 1-D benchmarks on core 0 alone.
pub const EVEN_SPLIT: [usize; 4] = [2, 4, 8, 16];

/// Whether the tile can be built with `n` cores.
#[must_use]
pub const fn is_supported(n: usize) -> bool {
    n.is_power_of_two() && n <= MAX_CORES
}

/// Shift amount turning `size / n` into `size >> shift(n)`.
///
/// Returns `None` for counts that are not supported.
#[must_use]
pub const fn shift(n: usize) -> Option<u32> {
    if is_supported(n) {
        Some(n.trailing_zeros())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_counts_are_powers_of_two() {
        for n in SUPPORTED {
            assert!(is_supported(n));
            assert_eq!(1usize << shift(n).unwrap(), n);
        }
    }

    #[test]
    fn rejects_unsupported_counts() {
        assert!(!is_supported(0));
        assert!(!is_supported(3));
        assert!(!is_supported(128));
        assert_eq!(shift(12), None);
    }

    #[test]
    fn even_split_is_subset() {
        assert!(EVEN_SPLIT.iter().all(|n| SUPPORTED.contains(n)));
    }
}
