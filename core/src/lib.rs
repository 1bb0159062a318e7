//! DAO Engine Core Library
//!
//! Shared primitives for the governance token economy: addresses and ids,
//! basis-point math, the execution context, calldata, events, errors and
//! capability checks.

pub mod access;
pub mod action;
pub mod env;
pub mod error;
pub mod event;
pub mod ledger;
pub mod math;
pub mod types;

// Re-export main types
pub use access::{AuthoritySet, Ownable, TimelockRole};
pub use action::{hash_calls, Action, Call, VoteType};
pub use env::{Env, ExecContext, MAX_CALL_DEPTH};
pub use error::{DaoError, Result};
pub use event::{Event, EventRecord};
pub use ledger::{Balances, TokenLedger, Votes};
pub use math::{apply_bps, checked_add, checked_sub, mul_div, BPS_DENOMINATOR, PRECISION};
pub use types::{
    amount_word, keccak256, keccak_concat, Address, Amount, BlockNumber, Timestamp, H256, UNIT,
};

/// Time constants (seconds)
pub mod time {
    pub const HOUR: u64 = 60 * 60;
    pub const DAY: u64 = 24 * HOUR;
    pub const WEEK: u64 = 7 * DAY;
}
