//! Run orchestration for the static partition strategies.
//!
//! Two termination designs share one contract: once any worker's oracle
//! accepts a key, every worker stops scanning within one check interval of
//! additional oracle calls, and exactly one result becomes authoritative.
//!
//! - **Direct notify** (block): the finder reports to the coordinating hub,
//!   which fans a stop message out to every other worker. Stop latency is
//!   about one check interval on receivers at O(N) messages per match.
//! - **Collective reduction** (interleaved): every worker joins a boolean-OR
//!   and a max-of-key reduction at each checkpoint. Message count per round
//!   is fixed, but the rendezvous synchronizes all workers to the slowest
//!   one, and same-round ties resolve by key value rather than arrival time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use tracing::{debug, info};

use crate::oracle::Oracle;
use crate::search::collective::{self, Member};
use crate::search::config::{SearchConfig, Strategy};
use crate::search::outcome::{NO_KEY, RunOutcome, WorkerReport, aggregate};
use crate::search::partition::{block_ranges, interleaved_candidates};
use crate::search::worker::{Batch, Scanner, scan_until};
use crate::search::{SearchError, WorkerId, dispatch};

/// How long the hub sleeps between deadline checks while idle.
const HUB_POLL: Duration = Duration::from_millis(100);

/// Message from a worker to the coordinating hub.
#[derive(Debug, Clone, Copy)]
pub(crate) enum WorkerMessage {
    /// The worker's oracle accepted `key`; sent at most once, immediately.
    Found { worker_id: WorkerId, key: u64 },
    /// Final report; sent exactly once when the worker's loop exits.
    Finished(WorkerReport),
}

/// Message from the hub to a worker.
#[derive(Debug, Clone, Copy)]
enum ControlMessage {
    /// Stop scanning after the current batch.
    Stop,
}

/// Stop flag shared by every worker for cheap checkpoint tests.
#[derive(Debug, Default)]
struct StopFlag(AtomicBool);

impl StopFlag {
    fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Validate `config` and run the search to completion, returning the agreed
/// outcome. The oracle prototype is cloned once per worker.
pub fn run_search<O>(config: &SearchConfig, oracle: &O) -> Result<RunOutcome, SearchError>
where
    O: Oracle + Clone + 'static,
{
    config.validate()?;
    let started = Instant::now();
    let deadline = config.deadline.map(|budget| started + budget);
    info!(
        upper = config.upper,
        workers = config.num_workers,
        strategy = %config.strategy,
        "starting search"
    );
    let outcome = match config.strategy {
        Strategy::Block => run_direct_notify(config, oracle, started, deadline)?,
        Strategy::Interleaved => run_collective(config, oracle, started, deadline)?,
        Strategy::Dynamic => dispatch::run_dynamic(config, oracle, started, deadline)?,
    };
    info!(
        found = outcome.found,
        evaluated = outcome.candidates_evaluated,
        "search finished"
    );
    Ok(outcome)
}

// --- Direct notify (block) ---

fn run_direct_notify<O>(
    config: &SearchConfig,
    oracle: &O,
    started: Instant,
    deadline: Option<Instant>,
) -> Result<RunOutcome, SearchError>
where
    O: Oracle + Clone + 'static,
{
    let num_workers = config.num_workers;
    let stop = Arc::new(StopFlag::default());
    let (worker_tx, hub_rx) = unbounded();
    let mut control_txs = Vec::with_capacity(num_workers);
    let mut handles = Vec::with_capacity(num_workers);

    for (worker_id, range) in block_ranges(config.upper, num_workers).into_iter().enumerate() {
        let (control_tx, control_rx) = bounded(1);
        control_txs.push(control_tx);
        let mut oracle = oracle.clone();
        let tx = worker_tx.clone();
        let stop = Arc::clone(&stop);
        let check_interval = config.check_interval;
        handles.push(thread::spawn(move || {
            debug!(worker_id, range = %range, "worker assigned block");
            let outcome = scan_until(&mut oracle, range.iter(), check_interval, || {
                stop.is_raised() || matches!(control_rx.try_recv(), Ok(ControlMessage::Stop))
            });
            if let Some(key) = outcome.found {
                info!(worker_id, key, "match found");
                let _ = tx.send(WorkerMessage::Found { worker_id, key });
            }
            let _ = tx.send(WorkerMessage::Finished(WorkerReport {
                worker_id,
                found: outcome.found,
                evaluated: outcome.evaluated,
            }));
        }));
    }
    drop(worker_tx);

    let reports = hub_loop(hub_rx, &control_txs, &stop, num_workers, deadline);
    join_workers(handles)?;
    Ok(aggregate(&reports?, num_workers, started.elapsed()))
}

/// Hub loop: collects found/finished messages, broadcasts stop on the first
/// find or on deadline expiry, and returns once every worker has reported.
fn hub_loop(
    rx: Receiver<WorkerMessage>,
    control_txs: &[Sender<ControlMessage>],
    stop: &StopFlag,
    num_workers: usize,
    deadline: Option<Instant>,
) -> Result<Vec<WorkerReport>, SearchError> {
    let mut reports = Vec::with_capacity(num_workers);
    let mut stopped = false;
    while reports.len() < num_workers {
        if !stopped && deadline.is_some_and(|d| Instant::now() >= d) {
            info!("deadline expired, stopping all workers");
            broadcast_stop(control_txs, stop);
            stopped = true;
        }
        match rx.recv_timeout(HUB_POLL) {
            Ok(WorkerMessage::Found { worker_id, key }) => {
                debug!(worker_id, key, "found notification at hub");
                if !stopped {
                    broadcast_stop(control_txs, stop);
                    stopped = true;
                }
            }
            Ok(WorkerMessage::Finished(report)) => reports.push(report),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Err(SearchError::Disconnected),
        }
    }
    Ok(reports)
}

fn broadcast_stop(control_txs: &[Sender<ControlMessage>], stop: &StopFlag) {
    stop.raise();
    for tx in control_txs {
        // a worker that already exited has dropped its receiver
        let _ = tx.try_send(ControlMessage::Stop);
    }
}

pub(crate) fn join_workers(handles: Vec<thread::JoinHandle<()>>) -> Result<(), SearchError> {
    for (worker_id, handle) in handles.into_iter().enumerate() {
        handle
            .join()
            .map_err(|_| SearchError::WorkerPanicked(worker_id))?;
    }
    Ok(())
}

// --- Collective reduction (interleaved) ---

fn run_collective<O>(
    config: &SearchConfig,
    oracle: &O,
    started: Instant,
    deadline: Option<Instant>,
) -> Result<RunOutcome, SearchError>
where
    O: Oracle + Clone + 'static,
{
    let num_workers = config.num_workers;
    let (outcome_tx, outcome_rx) = bounded(1);
    let mut handles = Vec::with_capacity(num_workers);

    for (worker_id, member) in collective::group(num_workers).into_iter().enumerate() {
        let mut oracle = oracle.clone();
        let outcome_tx = outcome_tx.clone();
        let upper = config.upper;
        let check_interval = config.check_interval;
        handles.push(thread::spawn(move || -> Result<(), SearchError> {
            let report = collective_worker(
                &mut oracle,
                &member,
                worker_id,
                num_workers,
                upper,
                check_interval,
                deadline,
            )?;

            // Final agreement: minimum non-sentinel key, one-based winner
            // flag maxed then decremented, total oracle calls summed.
            let key = member.all_reduce(report.found.unwrap_or(NO_KEY), u64::min)?;
            let flag = member.all_reduce(
                report.found.map_or(0, |_| worker_id as u64 + 1),
                u64::max,
            )?;
            let evaluated = member.all_reduce(report.evaluated, |a, b| a + b)?;

            if worker_id == 0 {
                let outcome = RunOutcome {
                    found: key != NO_KEY,
                    key: (key != NO_KEY).then_some(key),
                    winner: (flag > 0).then(|| flag as usize - 1),
                    elapsed: started.elapsed(),
                    candidates_evaluated: evaluated,
                    num_workers,
                };
                let _ = outcome_tx.send(outcome);
            }
            Ok(())
        }));
    }
    drop(outcome_tx);

    let mut first_error = None;
    for (worker_id, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
            Err(_) => {
                if first_error.is_none() {
                    first_error = Some(SearchError::WorkerPanicked(worker_id));
                }
            }
        }
    }
    if let Some(error) = first_error {
        return Err(error);
    }
    outcome_rx.recv().map_err(|_| SearchError::Disconnected)
}

/// One interleaved worker: scan a batch, then join the round reductions.
///
/// Each round reduces a boolean OR (a find anywhere, or deadline expiry) and
/// a max-of-key tie-break, plus an all-exhausted flag so a no-match run
/// terminates even when checkpoint counts differ by a round across workers.
fn collective_worker<O: Oracle>(
    oracle: &mut O,
    member: &Member,
    worker_id: WorkerId,
    num_workers: usize,
    upper: u64,
    check_interval: u64,
    deadline: Option<Instant>,
) -> Result<WorkerReport, SearchError> {
    let candidates = interleaved_candidates(upper, num_workers, worker_id);
    let mut scanner = Scanner::new(oracle, candidates, check_interval);
    let mut found: Option<u64> = None;
    let mut exhausted = false;

    loop {
        if found.is_none() && !exhausted {
            match scanner.scan_batch() {
                Batch::Found(key) => {
                    info!(worker_id, key, "match found");
                    found = Some(key);
                }
                Batch::Exhausted => exhausted = true,
                Batch::Checkpoint => {}
            }
        }

        let local_stop = found.is_some() || deadline.is_some_and(|d| Instant::now() >= d);
        let any_stop = member.all_reduce(u64::from(local_stop), u64::max)? != 0;
        let round_key = member.all_reduce(found.unwrap_or(0), u64::max)?;
        let all_exhausted = member.all_reduce(u64::from(exhausted), u64::min)? != 0;

        if any_stop {
            debug!(worker_id, round_key, "stop agreed at rendezvous");
            break;
        }
        if all_exhausted {
            break;
        }
    }

    Ok(WorkerReport {
        worker_id,
        found,
        evaluated: scanner.evaluated(),
    })
}
