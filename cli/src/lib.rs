//! DAO Engine command-line front end
//!
//! `daoctl` keeps one deployment in a JSON state file and runs each
//! subcommand as a transaction against it.

pub mod accounts;
pub mod actions;
pub mod commands;
pub mod display;
pub mod state;
pub mod units;

pub use actions::ActionSpec;
pub use commands::{AccountSummary, ProposalSummary, Support, TokenKind};
pub use state::StateFile;
