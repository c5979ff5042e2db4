//! Dynamic chunk dispatch.
//!
//! A single dispatcher owns the "next unassigned offset" cursor and leases
//! fixed-size chunks to requesting workers over channels; the cursor has one
//! writer by construction. On the first found notification (or deadline
//! expiry) the dispatcher broadcasts a terminate sentinel to every worker,
//! including those with an outstanding lease, and waits for all of them to
//! acknowledge before aggregating.
//!
//! Chunk size trades request/lease round trips against termination latency,
//! symmetrically with the static strategies' check interval.

use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use tracing::{debug, info};

use crate::oracle::Oracle;
use crate::search::config::SearchConfig;
use crate::search::coordinator::join_workers;
use crate::search::outcome::{RunOutcome, WorkerReport, aggregate};
use crate::search::partition::Range;
use crate::search::worker::scan_until;
use crate::search::{SearchError, WorkerId};

/// How long the dispatcher sleeps between deadline checks while idle.
const DISPATCH_POLL: Duration = Duration::from_millis(100);

/// Worker to dispatcher.
#[derive(Debug, Clone, Copy)]
enum Request {
    /// Lease me a chunk.
    Work { worker_id: WorkerId },
    /// My oracle accepted `key`.
    Found { worker_id: WorkerId, key: u64 },
    /// Acknowledgement that this worker's loop has exited; sent exactly once.
    Done(WorkerReport),
}

/// Dispatcher to worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reply {
    /// Scan this chunk, then ask again.
    Lease(Range),
    /// The space is exhausted; stop asking.
    NoMoreWork,
    /// Stop immediately, even mid-chunk.
    Terminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Dispatching,
    Stopping,
}

pub(crate) fn run_dynamic<O>(
    config: &SearchConfig,
    oracle: &O,
    started: Instant,
    deadline: Option<Instant>,
) -> Result<RunOutcome, SearchError>
where
    O: Oracle + Clone + 'static,
{
    // With one worker the request/lease protocol is pure overhead.
    if config.num_workers == 1 {
        return run_sequential(config, oracle.clone(), started, deadline);
    }

    let num_workers = config.num_workers;
    let (request_tx, request_rx) = unbounded();
    let mut reply_txs = Vec::with_capacity(num_workers);
    let mut handles = Vec::with_capacity(num_workers);

    for worker_id in 0..num_workers {
        let (reply_tx, reply_rx) = unbounded();
        reply_txs.push(reply_tx);
        let oracle = oracle.clone();
        let tx = request_tx.clone();
        let check_interval = config.check_interval;
        handles.push(thread::spawn(move || {
            dynamic_worker(oracle, worker_id, check_interval, tx, reply_rx);
        }));
    }
    drop(request_tx);

    let reports = run_dispatcher(
        request_rx,
        &reply_txs,
        config.upper,
        config.chunk_size,
        deadline,
    );
    // Unblock any worker still waiting on a reply before joining.
    drop(reply_txs);
    join_workers(handles)?;
    Ok(aggregate(&reports?, num_workers, started.elapsed()))
}

/// Sequential degradation for a single-worker cluster: scan `[0, upper)`
/// directly, keeping the checkpoint cadence for deadline checks.
fn run_sequential<O: Oracle>(
    config: &SearchConfig,
    mut oracle: O,
    started: Instant,
    deadline: Option<Instant>,
) -> Result<RunOutcome, SearchError> {
    let outcome = scan_until(
        &mut oracle,
        Range::new(0, config.upper).iter(),
        config.check_interval,
        || deadline.is_some_and(|d| Instant::now() >= d),
    );
    if let Some(key) = outcome.found {
        info!(worker_id = 0, key, "match found");
    }
    let report = WorkerReport {
        worker_id: 0,
        found: outcome.found,
        evaluated: outcome.evaluated,
    };
    Ok(aggregate(&[report], 1, started.elapsed()))
}

/// Worker side of the lease protocol.
fn dynamic_worker<O: Oracle>(
    mut oracle: O,
    worker_id: WorkerId,
    check_interval: u64,
    tx: Sender<Request>,
    rx: Receiver<Reply>,
) {
    let mut evaluated = 0u64;
    let mut found = None;

    loop {
        if tx.send(Request::Work { worker_id }).is_err() {
            break;
        }
        let lease = match rx.recv() {
            Ok(Reply::Lease(range)) => range,
            Ok(Reply::NoMoreWork) | Ok(Reply::Terminate) | Err(_) => break,
        };
        debug!(worker_id, lease = %lease, "chunk leased");

        let outcome = scan_until(&mut oracle, lease.iter(), check_interval, || {
            // the dispatcher may push a terminate while the chunk is in flight
            matches!(rx.try_recv(), Ok(Reply::Terminate))
        });
        evaluated += outcome.evaluated;

        if let Some(key) = outcome.found {
            info!(worker_id, key, "match found");
            found = Some(key);
            let _ = tx.send(Request::Found { worker_id, key });
            break;
        }
        if outcome.interrupted {
            break;
        }
    }

    let _ = tx.send(Request::Done(WorkerReport {
        worker_id,
        found,
        evaluated,
    }));
}

/// Dispatcher loop; returns once every worker has acknowledged.
fn run_dispatcher(
    rx: Receiver<Request>,
    reply_txs: &[Sender<Reply>],
    upper: u64,
    chunk_size: u64,
    deadline: Option<Instant>,
) -> Result<Vec<WorkerReport>, SearchError> {
    let num_workers = reply_txs.len();
    let mut state = State::Dispatching;
    let mut next = 0u64;
    let mut reports = Vec::with_capacity(num_workers);

    while reports.len() < num_workers {
        if state == State::Dispatching && deadline.is_some_and(|d| Instant::now() >= d) {
            info!("deadline expired, terminating all workers");
            state = State::Stopping;
            broadcast_terminate(reply_txs);
        }
        match rx.recv_timeout(DISPATCH_POLL) {
            Ok(Request::Work { worker_id }) => {
                let reply = match state {
                    State::Dispatching if next < upper => {
                        let end = next.saturating_add(chunk_size).min(upper);
                        let lease = Range::new(next, end);
                        next = end;
                        debug!(worker_id, lease = %lease, "dispatching chunk");
                        Reply::Lease(lease)
                    }
                    State::Dispatching => {
                        debug!(worker_id, "space exhausted");
                        Reply::NoMoreWork
                    }
                    State::Stopping => Reply::Terminate,
                };
                // In the stopping state a worker may legitimately have exited
                // already; while dispatching, a dead worker is fatal.
                if reply_txs[worker_id].send(reply).is_err() && state == State::Dispatching {
                    return Err(SearchError::Disconnected);
                }
            }
            Ok(Request::Found { worker_id, key }) => {
                debug!(worker_id, key, "found notification at dispatcher");
                if state == State::Dispatching {
                    state = State::Stopping;
                    broadcast_terminate(reply_txs);
                }
            }
            Ok(Request::Done(report)) => reports.push(report),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Err(SearchError::Disconnected),
        }
    }
    Ok(reports)
}

fn broadcast_terminate(reply_txs: &[Sender<Reply>]) {
    for tx in reply_txs {
        // workers that already acknowledged have dropped their receiver
        let _ = tx.send(Reply::Terminate);
    }
}
