//! DAO Engine Timelock
//!
//! Holds governance-approved operations for a minimum delay before anyone
//! with the executor role may run them.

pub mod timelock;

// Re-export main types
pub use timelock::{Operation, OperationState, Timelock};

