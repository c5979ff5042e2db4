//! Per-worker search loop.
//!
//! Candidates are evaluated in strictly increasing order, `check_interval`
//! oracle calls at a time. What happens between batches belongs to the
//! caller: polling a stop channel, joining a collective round, or nothing.
//! Yield decisions depend only on the number of oracle calls made, never on
//! wall-clock time, so a run's evaluation trace is reproducible.

use crate::oracle::Oracle;

/// What one batch of oracle calls produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Batch {
    /// The batch ran to the checkpoint without a match; candidates remain.
    Checkpoint,
    /// A candidate satisfied the oracle.
    Found(u64),
    /// The candidate source ran out without a match.
    Exhausted,
}

/// Scans a candidate stream against an oracle in checkpoint-sized batches.
pub struct Scanner<'a, O, I> {
    oracle: &'a mut O,
    candidates: I,
    check_interval: u64,
    evaluated: u64,
}

impl<'a, O: Oracle, I: Iterator<Item = u64>> Scanner<'a, O, I> {
    pub fn new(oracle: &'a mut O, candidates: I, check_interval: u64) -> Self {
        Self {
            oracle,
            candidates,
            check_interval: check_interval.max(1),
            evaluated: 0,
        }
    }

    /// Total oracle calls made so far.
    pub fn evaluated(&self) -> u64 {
        self.evaluated
    }

    /// Run at most `check_interval` oracle calls, stopping early on a match
    /// or on exhaustion.
    pub fn scan_batch(&mut self) -> Batch {
        for _ in 0..self.check_interval {
            let Some(candidate) = self.candidates.next() else {
                return Batch::Exhausted;
            };
            self.evaluated += 1;
            if self.oracle.verify(candidate) {
                return Batch::Found(candidate);
            }
        }
        Batch::Checkpoint
    }
}

/// Result of scanning a candidate stream to completion.
#[derive(Debug, Clone, Copy)]
pub struct ScanOutcome {
    /// Key this worker personally found, if any.
    pub found: Option<u64>,
    /// Oracle calls made.
    pub evaluated: u64,
    /// True when `should_stop` cut the scan short.
    pub interrupted: bool,
}

/// Scan until a match, exhaustion, or `should_stop` returning true at a
/// checkpoint. A match anywhere else in the cluster is therefore observed
/// within one check interval of additional oracle calls.
pub fn scan_until<O: Oracle, I: Iterator<Item = u64>>(
    oracle: &mut O,
    candidates: I,
    check_interval: u64,
    mut should_stop: impl FnMut() -> bool,
) -> ScanOutcome {
    let mut scanner = Scanner::new(oracle, candidates, check_interval);
    loop {
        match scanner.scan_batch() {
            Batch::Found(key) => {
                return ScanOutcome {
                    found: Some(key),
                    evaluated: scanner.evaluated(),
                    interrupted: false,
                };
            }
            Batch::Exhausted => {
                return ScanOutcome {
                    found: None,
                    evaluated: scanner.evaluated(),
                    interrupted: false,
                };
            }
            Batch::Checkpoint => {
                if should_stop() {
                    return ScanOutcome {
                        found: None,
                        evaluated: scanner.evaluated(),
                        interrupted: true,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equals(target: u64) -> impl FnMut(u64) -> bool + Send {
        move |candidate| candidate == target
    }

    #[test]
    fn test_scan_batch_checkpoints_at_interval() {
        let mut oracle = equals(u64::MAX);
        let mut scanner = Scanner::new(&mut oracle, 0..100, 32);
        assert_eq!(scanner.scan_batch(), Batch::Checkpoint);
        assert_eq!(scanner.evaluated(), 32);
        assert_eq!(scanner.scan_batch(), Batch::Checkpoint);
        assert_eq!(scanner.scan_batch(), Batch::Checkpoint);
        assert_eq!(scanner.scan_batch(), Batch::Exhausted);
        assert_eq!(scanner.evaluated(), 100);
    }

    #[test]
    fn test_scan_batch_stops_on_match() {
        let mut oracle = equals(5);
        let mut scanner = Scanner::new(&mut oracle, 0..100, 32);
        assert_eq!(scanner.scan_batch(), Batch::Found(5));
        assert_eq!(scanner.evaluated(), 6);
    }

    #[test]
    fn test_scan_until_finds_match_without_stop() {
        let mut oracle = equals(42);
        let outcome = scan_until(&mut oracle, 0..100, 8, || false);
        assert_eq!(outcome.found, Some(42));
        assert_eq!(outcome.evaluated, 43);
        assert!(!outcome.interrupted);
    }

    #[test]
    fn test_scan_until_exhausts_without_match() {
        let mut oracle = equals(1_000);
        let outcome = scan_until(&mut oracle, 0..100, 8, || false);
        assert_eq!(outcome.found, None);
        assert_eq!(outcome.evaluated, 100);
        assert!(!outcome.interrupted);
    }

    #[test]
    fn test_scan_until_honors_stop_at_first_checkpoint() {
        let mut oracle = equals(u64::MAX);
        let outcome = scan_until(&mut oracle, 0..1_000, 16, || true);
        assert_eq!(outcome.evaluated, 16);
        assert!(outcome.interrupted);
    }

    #[test]
    fn test_zero_interval_clamped_to_one() {
        let mut oracle = equals(u64::MAX);
        let mut scanner = Scanner::new(&mut oracle, 0..10, 0);
        assert_eq!(scanner.scan_batch(), Batch::Checkpoint);
        assert_eq!(scanner.evaluated(), 1);
    }
}
