//! DAO Engine Economics Module
//!
//! Implements the revenue side of the token economy:
//! - Tax-aware transfer engine (buy/sell tax, anti-whale limits)
//! - Staking vault with a reward-per-token accumulator
//! - Revenue splitter feeding the vault, the burn sink and the dev wallet

pub mod splitter;
pub mod tax_token;
pub mod vault;

pub use splitter::{Distribution, RevenueShares, RevenueSplitter};
pub use tax_token::{TaxConfig, TaxToken, TransferKind, TransferQuote};
pub use vault::{StakePosition, StakingVault};

/// Economic constants
pub mod constants {
    use dao_core::{time, Address, Amount};

    /// Upper bound for buy and sell tax (25%)
    pub const MAX_TAX_BPS: u16 = 2_500;

    /// Default buy tax (5%)
    pub const DEFAULT_BUY_TAX_BPS: u16 = 500;

    /// Default sell tax (5%)
    pub const DEFAULT_SELL_TAX_BPS: u16 = 500;

    /// Default max transaction amount is supply / 100 (1%)
    pub const DEFAULT_MAX_TX_DIVISOR: Amount = 100;

    /// Default max wallet amount is supply / 50 (2%)
    pub const DEFAULT_MAX_WALLET_DIVISOR: Amount = 50;

    /// Default stake lock (7 days)
    pub const DEFAULT_MIN_LOCK_PERIOD: u64 = time::WEEK;

    /// Default revenue split: 50% stakers, 20% burn, 30% dev
    pub const DEFAULT_STAKING_SHARE_BPS: u16 = 5_000;
    pub const DEFAULT_BURN_SHARE_BPS: u16 = 2_000;
    pub const DEFAULT_DEV_SHARE_BPS: u16 = 3_000;

    pub const BURN_ADDRESS: Address = Address::BURN;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_economic_constants() {
        assert_eq!(constants::MAX_TAX_BPS, 2_500);
        assert_eq!(constants::DEFAULT_MIN_LOCK_PERIOD, 604_800);
        assert_eq!(
            constants::DEFAULT_STAKING_SHARE_BPS
                + constants::DEFAULT_BURN_SHARE_BPS
                + constants::DEFAULT_DEV_SHARE_BPS,
            dao_core::BPS_DENOMINATOR
        );
    }
}
