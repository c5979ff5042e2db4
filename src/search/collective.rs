//! Channel-based collective reductions.
//!
//! A reduction group of N members supports all-reduce over `u64` with an
//! arbitrary commutative fold. Every member must call the same collectives in
//! the same order; each call is a rendezvous gated by the slowest member, and
//! no member observes the result before all have contributed. Member 0
//! gathers contributions over a dedicated channel per member (so a vanished
//! peer surfaces as a disconnect, not a hang), folds them, and broadcasts the
//! result back.

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::search::SearchError;

enum Role {
    /// Member 0: gathers from every other member, folds, broadcasts.
    Leader {
        gather: Vec<Receiver<u64>>,
        results: Vec<Sender<u64>>,
    },
    /// Members 1..N: contribute, then wait for the folded value.
    Follower {
        gather: Sender<u64>,
        result: Receiver<u64>,
    },
}

/// One participant's handle into a reduction group of fixed size.
pub struct Member {
    rank: usize,
    size: usize,
    role: Role,
}

/// Create a reduction group with `size` members; handle `i` belongs to rank
/// `i`.
pub fn group(size: usize) -> Vec<Member> {
    assert!(size > 0, "a reduction group needs at least one member");
    let mut gather_rxs = Vec::with_capacity(size - 1);
    let mut result_txs = Vec::with_capacity(size - 1);
    let mut follower_ends = Vec::with_capacity(size - 1);
    for _ in 1..size {
        let (gather_tx, gather_rx) = bounded(1);
        let (result_tx, result_rx) = bounded(1);
        gather_rxs.push(gather_rx);
        result_txs.push(result_tx);
        follower_ends.push((gather_tx, result_rx));
    }

    let mut members = Vec::with_capacity(size);
    members.push(Member {
        rank: 0,
        size,
        role: Role::Leader {
            gather: gather_rxs,
            results: result_txs,
        },
    });
    for (i, (gather, result)) in follower_ends.into_iter().enumerate() {
        members.push(Member {
            rank: i + 1,
            size,
            role: Role::Follower { gather, result },
        });
    }
    members
}

impl Member {
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Fold every member's `local` contribution with `fold` and return the
    /// result to all members.
    pub fn all_reduce(
        &self,
        local: u64,
        fold: impl Fn(u64, u64) -> u64,
    ) -> Result<u64, SearchError> {
        match &self.role {
            Role::Leader { gather, results } => {
                let mut acc = local;
                for rx in gather {
                    let contribution = rx.recv().map_err(|_| SearchError::Disconnected)?;
                    acc = fold(acc, contribution);
                }
                for tx in results {
                    tx.send(acc).map_err(|_| SearchError::Disconnected)?;
                }
                Ok(acc)
            }
            Role::Follower { gather, result } => {
                gather.send(local).map_err(|_| SearchError::Disconnected)?;
                result.recv().map_err(|_| SearchError::Disconnected)
            }
        }
    }
}
