//! keysweep - distributed first-match search over a bounded key space.
//!
//! The search space `[0, upper)` is divided among N worker threads by one of
//! three partition strategies; every worker tests candidates against a
//! verification oracle, and the whole cluster stops as soon as any worker
//! finds a match. The production oracle decrypts a DES/ECB ciphertext under
//! the candidate key and looks for a known plaintext pattern.

pub mod oracle;
pub mod search;
