//! Error taxonomy shared by every contract and the host runtime

use thiserror::Error;

use crate::types::{Address, Amount, BlockNumber, Timestamp, H256};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DaoError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Account {voter} already voted on proposal {proposal}")]
    AlreadyVoted { proposal: H256, voter: Address },

    #[error("Operation {0} already scheduled")]
    AlreadyScheduled(H256),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Block {requested} is not yet finalized (current block {current})")]
    InvalidBlock {
        requested: BlockNumber,
        current: BlockNumber,
    },

    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: Amount, need: Amount },

    #[error("Insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: Amount, need: Amount },

    #[error("Lock period not elapsed: unlocks at {unlocks_at}")]
    LockNotElapsed { unlocks_at: Timestamp },

    #[error("Nothing to distribute")]
    NothingToDistribute,

    #[error("Nothing to claim")]
    NothingToClaim,

    #[error("Trading not enabled")]
    TradingDisabled,

    #[error("Exceeds {limit_kind} limit: {amount} > {limit}")]
    ExceedsLimit {
        limit_kind: &'static str,
        amount: Amount,
        limit: Amount,
    },

    #[error("Signature expired at {deadline}")]
    ExpiredSignature { deadline: Timestamp },

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("No contract at {0}")]
    UnknownTarget(Address),

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Codec error: {0}")]
    Codec(String),
}

impl From<bincode::Error> for DaoError {
    fn from(err: bincode::Error) -> Self {
        DaoError::Codec(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DaoError>;
