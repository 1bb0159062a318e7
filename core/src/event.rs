//! Structured events emitted by every state-changing entry point
//!
//! Each event carries enough fields to rebuild the affected state without
//! replaying transactions, so an off-chain indexer can page through the log.

use serde::{Deserialize, Serialize};

use crate::access::TimelockRole;
use crate::action::{Call, VoteType};
use crate::types::{Address, Amount, BlockNumber, Timestamp, H256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    // Ledgers
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
    },
    Approval {
        owner: Address,
        spender: Address,
        amount: Amount,
    },
    DelegateChanged {
        delegator: Address,
        from_delegate: Address,
        to_delegate: Address,
    },
    DelegateVotesChanged {
        delegate: Address,
        previous_votes: Amount,
        new_votes: Amount,
    },
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },

    // Tax engine
    BuyTaxUpdated {
        bps: u16,
    },
    SellTaxUpdated {
        bps: u16,
    },
    MaxTransactionAmountUpdated {
        amount: Amount,
    },
    MaxWalletAmountUpdated {
        amount: Amount,
    },
    TaxRecipientUpdated {
        recipient: Address,
    },
    TradingEnabled {
        enabled: bool,
    },
    AmmPairUpdated {
        pair: Address,
        is_pair: bool,
    },
    TaxExemptUpdated {
        account: Address,
        exempt: bool,
    },
    LimitExemptUpdated {
        account: Address,
        exempt: bool,
    },

    // Staking vault
    Staked {
        user: Address,
        amount: Amount,
    },
    Withdrawn {
        user: Address,
        amount: Amount,
    },
    RewardsClaimed {
        user: Address,
        amount: Amount,
    },
    RewardsAdded {
        amount: Amount,
        reward_per_token: Amount,
    },
    MinLockPeriodUpdated {
        period: u64,
    },

    // Revenue splitter
    RevenueDistributed {
        staking: Amount,
        burn: Amount,
        dev: Amount,
    },
    SharesUpdated {
        staking_bps: u16,
        burn_bps: u16,
        dev_bps: u16,
    },
    DevWalletUpdated {
        wallet: Address,
    },
    StakingVaultUpdated {
        vault: Address,
    },

    // Timelock
    CallScheduled {
        id: H256,
        index: usize,
        call: Call,
        predecessor: H256,
        delay: u64,
    },
    CallExecuted {
        id: H256,
        index: usize,
        call: Call,
    },
    Cancelled {
        id: H256,
    },
    MinDelayChange {
        old_delay: u64,
        new_delay: u64,
    },
    RoleGranted {
        role: TimelockRole,
        account: Address,
        sender: Address,
    },
    RoleRevoked {
        role: TimelockRole,
        account: Address,
        sender: Address,
    },

    // Governor
    ProposalCreated {
        proposal_id: H256,
        proposer: Address,
        calls: Vec<Call>,
        description: String,
        vote_start: BlockNumber,
        vote_end: BlockNumber,
    },
    VoteCast {
        voter: Address,
        proposal_id: H256,
        support: VoteType,
        weight: Amount,
        reason: String,
    },
    ProposalQueued {
        proposal_id: H256,
        eta: Timestamp,
    },
    ProposalExecuted {
        proposal_id: H256,
    },
    ProposalCanceled {
        proposal_id: H256,
    },
    VotingDelaySet {
        old_delay: u64,
        new_delay: u64,
    },
    VotingPeriodSet {
        old_period: u64,
        new_period: u64,
    },
    ProposalThresholdSet {
        old_threshold: Amount,
        new_threshold: Amount,
    },
    QuorumUpdated {
        old_bps: u16,
        new_bps: u16,
    },
    GuardianUpdated {
        guardian: Address,
    },
}

impl Event {
    /// Event name as used for log filtering
    pub fn name(&self) -> &'static str {
        match self {
            Event::Transfer { .. } => "Transfer",
            Event::Approval { .. } => "Approval",
            Event::DelegateChanged { .. } => "DelegateChanged",
            Event::DelegateVotesChanged { .. } => "DelegateVotesChanged",
            Event::OwnershipTransferred { .. } => "OwnershipTransferred",
            Event::BuyTaxUpdated { .. } => "BuyTaxUpdated",
            Event::SellTaxUpdated { .. } => "SellTaxUpdated",
            Event::MaxTransactionAmountUpdated { .. } => "MaxTransactionAmountUpdated",
            Event::MaxWalletAmountUpdated { .. } => "MaxWalletAmountUpdated",
            Event::TaxRecipientUpdated { .. } => "TaxRecipientUpdated",
            Event::TradingEnabled { .. } => "TradingEnabled",
            Event::AmmPairUpdated { .. } => "AmmPairUpdated",
            Event::TaxExemptUpdated { .. } => "TaxExemptUpdated",
            Event::LimitExemptUpdated { .. } => "LimitExemptUpdated",
            Event::Staked { .. } => "Staked",
            Event::Withdrawn { .. } => "Withdrawn",
            Event::RewardsClaimed { .. } => "RewardsClaimed",
            Event::RewardsAdded { .. } => "RewardsAdded",
            Event::MinLockPeriodUpdated { .. } => "MinLockPeriodUpdated",
            Event::RevenueDistributed { .. } => "RevenueDistributed",
            Event::SharesUpdated { .. } => "SharesUpdated",
            Event::DevWalletUpdated { .. } => "DevWalletUpdated",
            Event::StakingVaultUpdated { .. } => "StakingVaultUpdated",
            Event::CallScheduled { .. } => "CallScheduled",
            Event::CallExecuted { .. } => "CallExecuted",
            Event::Cancelled { .. } => "Cancelled",
            Event::MinDelayChange { .. } => "MinDelayChange",
            Event::RoleGranted { .. } => "RoleGranted",
            Event::RoleRevoked { .. } => "RoleRevoked",
            Event::ProposalCreated { .. } => "ProposalCreated",
            Event::VoteCast { .. } => "VoteCast",
            Event::ProposalQueued { .. } => "ProposalQueued",
            Event::ProposalExecuted { .. } => "ProposalExecuted",
            Event::ProposalCanceled { .. } => "ProposalCanceled",
            Event::VotingDelaySet { .. } => "VotingDelaySet",
            Event::VotingPeriodSet { .. } => "VotingPeriodSet",
            Event::ProposalThresholdSet { .. } => "ProposalThresholdSet",
            Event::QuorumUpdated { .. } => "QuorumUpdated",
            Event::GuardianUpdated { .. } => "GuardianUpdated",
        }
    }
}

/// An event together with where and when it was emitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub block: BlockNumber,
    pub timestamp: Timestamp,
    pub emitter: Address,
    pub event: Event,
}
