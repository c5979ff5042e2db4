//! Partition planner: static division of the key space among workers.

use std::fmt;

/// Half-open interval `[start, end)` of candidate keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: u64,
    pub end: u64,
}

impl Range {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Candidates in increasing order.
    pub fn iter(&self) -> std::ops::Range<u64> {
        self.start..self.end
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Contiguous block ranges for `num_workers` workers over `[0, upper)`.
///
/// Every worker gets `upper / num_workers` candidates except the last, whose
/// range extends to `upper` exactly and absorbs the division remainder. All
/// upper bounds are exclusive; the ranges partition the space with no gap and
/// no overlap.
pub fn block_ranges(upper: u64, num_workers: usize) -> Vec<Range> {
    debug_assert!(num_workers > 0);
    let n = num_workers as u64;
    let per_worker = upper / n;
    (0..n)
        .map(|i| {
            let start = per_worker * i;
            let end = if i == n - 1 { upper } else { per_worker * (i + 1) };
            Range::new(start, end)
        })
        .collect()
}

/// Candidates owned by worker `id` under interleaved partitioning:
/// `id, id + N, id + 2N, ...` strictly below `upper`.
pub fn interleaved_candidates(
    upper: u64,
    num_workers: usize,
    id: usize,
) -> impl Iterator<Item = u64> {
    debug_assert!(num_workers > 0 && id < num_workers);
    (id as u64..upper).step_by(num_workers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_block_remainder_absorbed_by_last_worker() {
        let ranges = block_ranges(16, 3);
        assert_eq!(
            ranges,
            vec![Range::new(0, 5), Range::new(5, 10), Range::new(10, 16)]
        );
    }

    #[test]
    fn test_block_single_worker_owns_everything() {
        assert_eq!(block_ranges(100, 1), vec![Range::new(0, 100)]);
    }

    #[test]
    fn test_block_more_workers_than_candidates() {
        let ranges = block_ranges(2, 4);
        let total: u64 = ranges.iter().map(Range::len).sum();
        assert_eq!(total, 2);
        assert_eq!(ranges.last().unwrap().end, 2);
    }

    #[test]
    fn test_interleaved_stride() {
        let owned: Vec<u64> = interleaved_candidates(10, 3, 1).collect();
        assert_eq!(owned, vec![1, 4, 7]);
    }

    #[test]
    fn test_interleaved_empty_when_id_beyond_upper() {
        assert_eq!(interleaved_candidates(2, 4, 3).count(), 0);
    }

    proptest! {
        /// Block ranges cover `[0, upper)` exactly once each, no gap, no
        /// overlap, including worker counts that do not divide `upper`.
        #[test]
        fn prop_block_ranges_partition_exactly(upper in 0u64..10_000, n in 1usize..17) {
            let ranges = block_ranges(upper, n);
            prop_assert_eq!(ranges.len(), n);
            let mut cursor = 0u64;
            for range in &ranges {
                prop_assert_eq!(range.start, cursor);
                prop_assert!(range.start <= range.end);
                cursor = range.end;
            }
            prop_assert_eq!(cursor, upper);
        }

        /// Interleaved ownership covers every candidate exactly once.
        #[test]
        fn prop_interleaved_partition_exactly(upper in 0u64..5_000, n in 1usize..9) {
            let mut all: Vec<u64> = (0..n)
                .flat_map(|id| interleaved_candidates(upper, n, id))
                .collect();
            all.sort_unstable();
            let expected: Vec<u64> = (0..upper).collect();
            prop_assert_eq!(all, expected);
        }

        /// Per-worker interleaved load differs by at most one candidate.
        #[test]
        fn prop_interleaved_load_is_even(upper in 0u64..5_000, n in 1usize..9) {
            let counts: Vec<usize> = (0..n)
                .map(|id| interleaved_candidates(upper, n, id).count())
                .collect();
            let min = *counts.iter().min().unwrap();
            let max = *counts.iter().max().unwrap();
            prop_assert!(max - min <= 1);
        }
    }
}
