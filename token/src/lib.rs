//! DAO Engine Voting Ledger
//!
//! Fixed-supply governance token. Holders delegate their balance to an
//! account whose voting power is checkpointed per block, so the governor can
//! read the power held at any past block.

pub mod checkpoints;
pub mod voting_token;

pub use checkpoints::{Checkpoint, Checkpoints};
pub use voting_token::{VotingToken, PERMIT_VERSION};
