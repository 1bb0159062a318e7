//! Deployment configuration, loaded from TOML
//!
//! Every section and field is defaulted, so an empty file describes the
//! reference deployment.

use dao_core::{time, Address, Amount, BPS_DENOMINATOR, UNIT};
use dao_economics::constants as econ;
use dao_governance::config as gov;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    /// Whole tokens, 18 decimals
    pub initial_supply: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: "DAOToken".to_string(),
            symbol: "DAO".to_string(),
            initial_supply: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxTokenConfig {
    pub name: String,
    pub symbol: String,
    pub initial_supply: u64,
    pub buy_tax_bps: u16,
    pub sell_tax_bps: u16,
}

impl Default for TaxTokenConfig {
    fn default() -> Self {
        Self {
            name: "TaxToken".to_string(),
            symbol: "TAX".to_string(),
            initial_supply: 1_000_000,
            buy_tax_bps: econ::DEFAULT_BUY_TAX_BPS,
            sell_tax_bps: econ::DEFAULT_SELL_TAX_BPS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    pub name: String,
    pub voting_delay: u64,
    pub voting_period: u64,
    /// Whole tokens of current voting power needed to propose
    pub proposal_threshold: u64,
    pub quorum_bps: u16,
    pub grace_period: u64,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            name: "DAOGovernor".to_string(),
            voting_delay: gov::DEFAULT_VOTING_DELAY,
            voting_period: gov::DEFAULT_VOTING_PERIOD,
            proposal_threshold: 0,
            quorum_bps: gov::DEFAULT_QUORUM_BPS,
            grace_period: gov::GRACE_PERIOD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelockConfig {
    pub min_delay: u64,
}

impl Default for TimelockConfig {
    fn default() -> Self {
        Self {
            min_delay: time::HOUR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub min_lock_period: u64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            min_lock_period: econ::DEFAULT_MIN_LOCK_PERIOD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    pub staking_share_bps: u16,
    pub burn_share_bps: u16,
    pub dev_share_bps: u16,
    /// Defaults to the deployer
    pub dev_wallet: Option<Address>,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            staking_share_bps: econ::DEFAULT_STAKING_SHARE_BPS,
            burn_share_bps: econ::DEFAULT_BURN_SHARE_BPS,
            dev_share_bps: econ::DEFAULT_DEV_SHARE_BPS,
            dev_wallet: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Seconds added to the clock per mined block
    pub block_time: u64,
    pub genesis_timestamp: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: 31337,
            block_time: 3,
            genesis_timestamp: 1_700_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationToken {
    Dao,
    Tax,
}

/// Genesis transfer from the deployer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub token: AllocationToken,
    pub to: Address,
    /// Whole tokens
    pub amount: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaoConfig {
    pub token: TokenConfig,
    pub tax_token: TaxTokenConfig,
    pub governor: GovernorConfig,
    pub timelock: TimelockConfig,
    pub vault: VaultConfig,
    pub splitter: SplitterConfig,
    pub chain: ChainConfig,
    pub allocations: Vec<Allocation>,
}

impl DaoConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: DaoConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let shares = u32::from(self.splitter.staking_share_bps)
            + u32::from(self.splitter.burn_share_bps)
            + u32::from(self.splitter.dev_share_bps);
        if shares > u32::from(BPS_DENOMINATOR) {
            return Err(ConfigError::Invalid(format!(
                "splitter shares sum to {shares} bps"
            )));
        }
        for (side, bps) in [
            ("buy", self.tax_token.buy_tax_bps),
            ("sell", self.tax_token.sell_tax_bps),
        ] {
            if bps > econ::MAX_TAX_BPS {
                return Err(ConfigError::Invalid(format!(
                    "{side} tax {bps} bps exceeds {}",
                    econ::MAX_TAX_BPS
                )));
            }
        }
        if self.governor.quorum_bps > BPS_DENOMINATOR {
            return Err(ConfigError::Invalid(format!(
                "quorum {} bps exceeds {BPS_DENOMINATOR}",
                self.governor.quorum_bps
            )));
        }
        if self.governor.voting_period == 0 {
            return Err(ConfigError::Invalid(
                "voting period must be positive".to_string(),
            ));
        }
        if self.token.initial_supply == 0 || self.tax_token.initial_supply == 0 {
            return Err(ConfigError::Invalid("initial supply must be positive".to_string()));
        }
        Ok(())
    }
}

/// Whole tokens to base units
pub fn whole_tokens(amount: u64) -> Amount {
    Amount::from(amount) * UNIT
}
