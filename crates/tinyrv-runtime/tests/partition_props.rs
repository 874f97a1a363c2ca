//! Partition properties over the whole supported core-count set.

use proptest::prelude::*;
use tinyrv_chip::cores;
use tinyrv_runtime::{partition, Partition, Policy};

fn assert_exact(part: &Partition, size: usize, num_cores: usize) {
    assert_eq!(part.len(), num_cores);
    let mut next = 0;
    for r in part.ranges() {
        assert_eq!(r.begin, next, "ranges must be contiguous: {part}");
        assert!(r.begin <= r.end);
        next = r.end;
    }
    assert_eq!(next, size, "ranges must cover the domain: {part}");
}

fn policy() -> impl Strategy<Value = Policy> {
    prop_oneof![Just(Policy::EvenSplitWithTail), Just(Policy::BalancedRemainder)]
}

fn supported_cores() -> impl Strategy<Value = usize> {
    proptest::sample::select(cores::SUPPORTED.to_vec())
}

proptest! {
    #[test]
    fn partition_is_exact(size in 0usize..10_000, n in supported_cores(), policy in policy()) {
        let part = partition(size, n, policy);
        assert_exact(&part, size, n);
        prop_assert_eq!(part.domain_size(), size);
    }

    #[test]
    fn balanced_differs_by_at_most_one(size in 0usize..10_000, n in supported_cores()) {
        let part = partition(size, n, Policy::BalancedRemainder);
        prop_assert!(!part.is_fallback());
        prop_assert!(part.max_imbalance() <= 1, "{}", part);
    }

    #[test]
    fn tail_only_grows_last_range(size in 0usize..10_000, n in proptest::sample::select(vec![2usize, 4, 8, 16])) {
        let part = partition(size, n, Policy::EvenSplitWithTail);
        let block = size / n;
        for r in &part.ranges()[..n - 1] {
            prop_assert_eq!(r.len(), block);
        }
        prop_assert_eq!(part.ranges()[n - 1].len(), size - block * (n - 1));
    }

    #[test]
    fn unsupported_counts_fall_back(size in 0usize..1_000, n in 0usize..100, policy in policy()) {
        prop_assume!(!cores::is_supported(n));
        let part = partition(size, n, policy);
        prop_assert!(part.is_fallback());
        prop_assert_eq!(part.ranges()[0].len(), size);
        prop_assert!(part.ranges()[1..].iter().all(|r| r.is_empty()));
    }
}

#[test]
fn worked_examples() {
    let tail = partition(100, 4, Policy::EvenSplitWithTail);
    assert_eq!(tail.to_string(), "[0,25) [25,50) [50,75) [75,100)");

    let lens: Vec<_> = partition(10, 4, Policy::BalancedRemainder)
        .ranges()
        .iter()
        .map(|r| r.len())
        .collect();
    assert_eq!(lens, [2, 2, 3, 3]);
}
