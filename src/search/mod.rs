//! Distributed first-match search over a bounded key space.
//!
//! Three partition strategies, each with its own termination design:
//! - **Block**: contiguous range per worker, direct-notify stop through the
//!   coordinating hub
//! - **Interleaved**: strided ranges, periodic collective reduction at every
//!   checkpoint
//! - **Dynamic**: a dispatcher leases fixed-size chunks on demand and
//!   broadcasts a terminate sentinel on the first find

pub mod collective;
pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod outcome;
pub mod partition;
pub mod worker;

pub use config::{ConfigError, SearchConfig, Strategy};
pub use coordinator::run_search;
pub use outcome::RunOutcome;
pub use partition::Range;

use thiserror::Error;

/// Worker identity, unique in `[0, N)` for the lifetime of a run.
pub type WorkerId = usize;

/// Failures past configuration validation; all are fatal to the run. No
/// partial or degraded result is ever reported.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A worker vanished mid-run, so the protocol cannot complete.
    #[error("a worker disconnected before the run completed")]
    Disconnected,
    #[error("worker {0} panicked")]
    WorkerPanicked(WorkerId),
}
