//! DAO Engine Governance Module
//!
//! Token-weighted proposal lifecycle: creation against a voting-power
//! snapshot, a fixed voting window, quorum and majority resolution, and
//! execution through the timelock.

pub mod governor;
pub mod proposal;

pub use governor::{ExecutionPlan, Governor, GovernorSettings};
pub use proposal::{Proposal, ProposalState, ProposalVotes, Receipt};

/// Governance configuration constants
pub mod config {
    use dao_core::time::DAY;

    /// Blocks between proposal creation and the voting snapshot
    pub const DEFAULT_VOTING_DELAY: u64 = 1;

    /// Voting window in blocks (~15 minutes at 3s blocks)
    pub const DEFAULT_VOTING_PERIOD: u64 = 300;

    /// Quorum as a share of total supply (4%)
    pub const DEFAULT_QUORUM_BPS: u16 = 400;

    /// Executable window after a queued proposal's eta (14 days)
    pub const GRACE_PERIOD: u64 = 14 * DAY;
}
