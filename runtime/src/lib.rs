//! DAO Engine Runtime
//!
//! The host the contracts run in: a single world state mutated by one
//! atomic transaction at a time, a block clock, the committed event log,
//! and deployment from a TOML configuration.

pub mod config;
pub mod dispatch;
pub mod log;
pub mod runtime;
pub mod world;

// Re-export main types
pub use config::{
    whole_tokens, Allocation, AllocationToken, ChainConfig, ConfigError, DaoConfig,
    GovernorConfig, SplitterConfig, TaxTokenConfig, TimelockConfig, TokenConfig, VaultConfig,
};
pub use dispatch::dispatch;
pub use log::{EventFilter, EventLog, EventPage};
pub use runtime::Runtime;
pub use world::World;
