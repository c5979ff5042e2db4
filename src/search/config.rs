//! Run configuration, supplied once and identically to every worker.

use std::time::Duration;

use thiserror::Error;

/// Default key-space bound: the full 56-bit DES key space.
pub const DEFAULT_UPPER: u64 = 1 << 56;

/// Default checkpoint cadence, in oracle calls.
pub const DEFAULT_CHECK_INTERVAL: u64 = 1 << 18;

/// Default dynamic-mode lease size, in candidates.
pub const DEFAULT_CHUNK_SIZE: u64 = 1_000_000;

/// How the key space is divided among workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Contiguous block per worker; the last worker absorbs the remainder.
    #[default]
    Block,
    /// Worker `i` owns `i, i+N, i+2N, ...`; even load wherever the match is.
    Interleaved,
    /// Fixed-size chunks leased on demand by the dispatcher.
    Dynamic,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Block => write!(f, "block"),
            Strategy::Interleaved => write!(f, "interleaved"),
            Strategy::Dynamic => write!(f, "dynamic"),
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "block" => Ok(Strategy::Block),
            "interleaved" | "interleave" | "strided" => Ok(Strategy::Interleaved),
            "dynamic" => Ok(Strategy::Dynamic),
            _ => Err(format!(
                "Unknown strategy: '{}'. Valid options: block, interleaved, dynamic",
                s
            )),
        }
    }
}

/// Configuration errors, detected before any worker starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("search space is empty (upper bound must be > 0)")]
    EmptySpace,
    #[error("worker count must be >= 1")]
    NoWorkers,
    #[error("check interval must be >= 1")]
    ZeroCheckInterval,
    #[error("chunk size must be >= 1 in dynamic mode")]
    ZeroChunkSize,
}

/// Configuration for one search run.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Exclusive upper bound of the key space `[0, upper)`.
    pub upper: u64,
    /// Partition strategy, shared by all workers.
    pub strategy: Strategy,
    /// Number of worker threads to spawn.
    pub num_workers: usize,
    /// Oracle calls between termination checks. Smaller values detect a
    /// remote match sooner but spend more time coordinating.
    pub check_interval: u64,
    /// Lease size for dynamic dispatch; ignored by the static strategies.
    pub chunk_size: u64,
    /// Optional wall-clock budget; expiry stops the run with `found = false`.
    pub deadline: Option<Duration>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            upper: DEFAULT_UPPER,
            strategy: Strategy::default(),
            num_workers: num_cpus::get(),
            check_interval: DEFAULT_CHECK_INTERVAL,
            chunk_size: DEFAULT_CHUNK_SIZE,
            deadline: None,
        }
    }
}

impl SearchConfig {
    /// Set the exclusive upper bound of the key space.
    pub fn with_upper(mut self, upper: u64) -> Self {
        self.upper = upper;
        self
    }

    /// Set the partition strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the number of workers.
    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    /// Set the checkpoint cadence.
    pub fn with_check_interval(mut self, check_interval: u64) -> Self {
        self.check_interval = check_interval;
        self
    }

    /// Set the dynamic-mode lease size.
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the wall-clock budget.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set the wall-clock budget from an Option.
    pub fn with_deadline_option(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Reject malformed configurations before any worker starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upper == 0 {
            return Err(ConfigError::EmptySpace);
        }
        if self.num_workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.check_interval == 0 {
            return Err(ConfigError::ZeroCheckInterval);
        }
        if self.strategy == Strategy::Dynamic && self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SearchConfig::default();
        assert_eq!(config.upper, 1 << 56);
        assert_eq!(config.strategy, Strategy::Block);
        assert!(config.num_workers >= 1);
        assert_eq!(config.check_interval, 1 << 18);
        assert_eq!(config.chunk_size, 1_000_000);
        assert!(config.deadline.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = SearchConfig::default()
            .with_upper(100)
            .with_strategy(Strategy::Dynamic)
            .with_workers(4)
            .with_check_interval(64)
            .with_chunk_size(16)
            .with_deadline(Duration::from_secs(5));

        assert_eq!(config.upper, 100);
        assert_eq!(config.strategy, Strategy::Dynamic);
        assert_eq!(config.num_workers, 4);
        assert_eq!(config.check_interval, 64);
        assert_eq!(config.chunk_size, 16);
        assert_eq!(config.deadline, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_validate_rejects_malformed_configs() {
        assert_eq!(
            SearchConfig::default().with_upper(0).validate(),
            Err(ConfigError::EmptySpace)
        );
        assert_eq!(
            SearchConfig::default().with_workers(0).validate(),
            Err(ConfigError::NoWorkers)
        );
        assert_eq!(
            SearchConfig::default().with_check_interval(0).validate(),
            Err(ConfigError::ZeroCheckInterval)
        );
        assert_eq!(
            SearchConfig::default()
                .with_strategy(Strategy::Dynamic)
                .with_chunk_size(0)
                .validate(),
            Err(ConfigError::ZeroChunkSize)
        );
        // chunk size is ignored outside dynamic mode
        assert!(SearchConfig::default().with_chunk_size(0).validate().is_ok());
    }

    #[test]
    fn test_strategy_round_trip() {
        for strategy in [Strategy::Block, Strategy::Interleaved, Strategy::Dynamic] {
            let parsed: Strategy = strategy.to_string().parse().unwrap();
            assert_eq!(parsed, strategy);
        }
        assert!("pyramid".parse::<Strategy>().is_err());
    }
}
