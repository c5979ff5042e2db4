//! Run outcome and final-agreement arithmetic.

use std::time::Duration;

use crate::search::WorkerId;

/// Sentinel for "no key" in reduction arithmetic.
pub(crate) const NO_KEY: u64 = u64::MAX;

/// One worker's final report, merged exactly once into the run outcome.
#[derive(Debug, Clone, Copy)]
pub struct WorkerReport {
    pub worker_id: WorkerId,
    /// Key this worker personally found, if any. Keys adopted from another
    /// worker's notification are not reported.
    pub found: Option<u64>,
    /// Oracle calls this worker made.
    pub evaluated: u64,
}

/// Final agreed result of a run, reported by the coordinating caller only.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub found: bool,
    pub key: Option<u64>,
    pub winner: Option<WorkerId>,
    pub elapsed: Duration,
    /// Oracle calls summed across all workers.
    pub candidates_evaluated: u64,
    pub num_workers: usize,
}

impl RunOutcome {
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// One-line machine-parseable report in the historical format:
    /// `np=<N>; key=<K>; winner=<W>; t_total=<secs> s[; text="..."]; build=<id>`
    /// with `key=NOT_FOUND` (and no winner or text field) on exhaustion.
    pub fn report_line(&self, text: Option<&str>) -> String {
        let build = concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));
        match self.key {
            Some(key) => {
                let winner = self.winner.unwrap_or_default();
                let text = text
                    .map(|t| format!(" text=\"{}\";", t))
                    .unwrap_or_default();
                format!(
                    "np={}; key={}; winner={}; t_total={:.6} s;{} build={}",
                    self.num_workers,
                    key,
                    winner,
                    self.elapsed_seconds(),
                    text,
                    build,
                )
            }
            None => format!(
                "np={}; key=NOT_FOUND; t_total={:.6} s; build={}",
                self.num_workers,
                self.elapsed_seconds(),
                build,
            ),
        }
    }
}

/// Merge per-worker reports into the agreed outcome.
///
/// The authoritative key is the minimum over personally-found keys, so a
/// numeric tie resolves to the smallest key. The winner identity is the
/// maximum one-based did-I-find-it flag across workers, decremented.
pub fn aggregate(reports: &[WorkerReport], num_workers: usize, elapsed: Duration) -> RunOutcome {
    let key = reports.iter().filter_map(|r| r.found).min();
    let winner_flag = reports
        .iter()
        .map(|r| if r.found.is_some() { r.worker_id + 1 } else { 0 })
        .max()
        .unwrap_or(0);
    let winner = if winner_flag > 0 {
        Some(winner_flag - 1)
    } else {
        None
    };
    let candidates_evaluated = reports.iter().map(|r| r.evaluated).sum();
    RunOutcome {
        found: key.is_some(),
        key,
        winner,
        elapsed,
        candidates_evaluated,
        num_workers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(worker_id: WorkerId, found: Option<u64>, evaluated: u64) -> WorkerReport {
        WorkerReport {
            worker_id,
            found,
            evaluated,
        }
    }

    #[test]
    fn test_aggregate_single_finder() {
        let reports = [
            report(0, None, 100),
            report(1, Some(42), 43),
            report(2, None, 100),
        ];
        let outcome = aggregate(&reports, 3, Duration::from_millis(5));
        assert!(outcome.found);
        assert_eq!(outcome.key, Some(42));
        assert_eq!(outcome.winner, Some(1));
        assert_eq!(outcome.candidates_evaluated, 243);
    }

    #[test]
    fn test_aggregate_tie_takes_minimum_key_and_flag_max_winner() {
        let reports = [report(0, Some(10), 11), report(1, Some(11), 6)];
        let outcome = aggregate(&reports, 2, Duration::ZERO);
        assert_eq!(outcome.key, Some(10));
        assert_eq!(outcome.winner, Some(1));
    }

    #[test]
    fn test_aggregate_no_match() {
        let reports = [report(0, None, 50), report(1, None, 50)];
        let outcome = aggregate(&reports, 2, Duration::ZERO);
        assert!(!outcome.found);
        assert_eq!(outcome.key, None);
        assert_eq!(outcome.winner, None);
        assert_eq!(outcome.candidates_evaluated, 100);
    }

    #[test]
    fn test_report_line_found() {
        let outcome = aggregate(&[report(2, Some(99), 100)], 4, Duration::from_secs(1));
        let line = outcome.report_line(Some("hello the world"));
        assert!(line.starts_with("np=4; key=99; winner=2; t_total=1.000000 s;"));
        assert!(line.contains("text=\"hello the world\";"));
        assert!(line.contains("build="));
    }

    #[test]
    fn test_report_line_not_found() {
        let outcome = aggregate(&[], 4, Duration::from_secs(2));
        let line = outcome.report_line(None);
        assert!(line.starts_with("np=4; key=NOT_FOUND; t_total=2.000000 s;"));
        assert!(!line.contains("winner"));
    }
}
