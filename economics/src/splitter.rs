//! Revenue splitter: fans accumulated tax revenue out to stakers, the burn
//! sink and the dev wallet

use dao_core::{
    apply_bps, Address, Amount, DaoError, Event, ExecContext, Ownable, Result, TokenLedger,
    BPS_DENOMINATOR,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::{
    BURN_ADDRESS, DEFAULT_BURN_SHARE_BPS, DEFAULT_DEV_SHARE_BPS, DEFAULT_STAKING_SHARE_BPS,
};
use crate::vault::StakingVault;

/// Share configuration. `version` increments on every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueShares {
    pub staking_bps: u16,
    pub burn_bps: u16,
    pub dev_bps: u16,
    pub version: u64,
}

/// Amounts computed for one `distribute` call; they always sum to the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Distribution {
    pub staking: Amount,
    pub burn: Amount,
    pub dev: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueSplitter {
    address: Address,
    token: Address,
    ownable: Ownable,
    shares: RevenueShares,
    dev_wallet: Address,
    staking_vault: Address,
}

impl RevenueSplitter {
    pub fn new(
        ctx: &mut ExecContext,
        address: Address,
        token: Address,
        staking_vault: Address,
        dev_wallet: Address,
        owner: Address,
    ) -> Self {
        info!(splitter = %address, %token, %staking_vault, %dev_wallet, "revenue splitter deployed");
        Self {
            address,
            token,
            ownable: Ownable::new(ctx, address, owner),
            shares: RevenueShares {
                staking_bps: DEFAULT_STAKING_SHARE_BPS,
                burn_bps: DEFAULT_BURN_SHARE_BPS,
                dev_bps: DEFAULT_DEV_SHARE_BPS,
                version: 0,
            },
            dev_wallet,
            staking_vault,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn owner(&self) -> Address {
        self.ownable.owner()
    }

    pub fn shares(&self) -> RevenueShares {
        self.shares
    }

    pub fn dev_wallet(&self) -> Address {
        self.dev_wallet
    }

    pub fn staking_vault(&self) -> Address {
        self.staking_vault
    }

    pub fn burn_address(&self) -> Address {
        BURN_ADDRESS
    }

    pub fn get_accumulated_balance<T: TokenLedger + ?Sized>(&self, token: &T) -> Amount {
        token.balance_of(self.address)
    }

    /// Splits `amount`; the dev share absorbs rounding dust and any
    /// unallocated basis points.
    pub fn preview(&self, amount: Amount) -> Result<Distribution> {
        let staking = apply_bps(amount, self.shares.staking_bps)?;
        let burn = apply_bps(amount, self.shares.burn_bps)?;
        Ok(Distribution {
            staking,
            burn,
            dev: amount - staking - burn,
        })
    }

    /// Permissionless. Sends the staking share to the vault's funding entry
    /// point, the burn share to the burn sink and the rest to the dev wallet.
    /// A zero vault or zero dev wallet leaves that share in the splitter.
    /// `vault` must be the contract at `staking_vault` when that is set.
    pub fn distribute<T: TokenLedger + ?Sized>(
        &self,
        ctx: &mut ExecContext,
        token: &mut T,
        vault: Option<&mut StakingVault>,
    ) -> Result<Distribution> {
        if token.address() != self.token {
            return Err(DaoError::InvalidParameter(format!(
                "splitter {} expects token {}, got {}",
                self.address,
                self.token,
                token.address()
            )));
        }
        let amount = token.balance_of(self.address);
        if amount == 0 {
            return Err(DaoError::NothingToDistribute);
        }
        let split = self.preview(amount)?;

        if !self.staking_vault.is_zero() && split.staking > 0 {
            let vault = match vault {
                Some(v) if v.address() == self.staking_vault => v,
                _ => return Err(DaoError::UnknownTarget(self.staking_vault)),
            };
            token.approve(ctx, self.address, self.staking_vault, split.staking)?;
            vault.add_rewards(ctx, token, self.address, split.staking)?;
        }
        if split.burn > 0 {
            token.transfer(ctx, self.address, BURN_ADDRESS, split.burn)?;
        }
        if !self.dev_wallet.is_zero() && split.dev > 0 {
            token.transfer(ctx, self.address, self.dev_wallet, split.dev)?;
        }

        ctx.emit(
            self.address,
            Event::RevenueDistributed {
                staking: split.staking,
                burn: split.burn,
                dev: split.dev,
            },
        );
        info!(
            splitter = %self.address,
            amount,
            staking = split.staking,
            burn = split.burn,
            dev = split.dev,
            "revenue distributed"
        );
        Ok(split)
    }

    pub fn set_shares(
        &mut self,
        ctx: &mut ExecContext,
        caller: Address,
        staking_bps: u16,
        burn_bps: u16,
        dev_bps: u16,
    ) -> Result<()> {
        self.ownable.ensure_owner(caller)?;
        let total = u32::from(staking_bps) + u32::from(burn_bps) + u32::from(dev_bps);
        if total > u32::from(BPS_DENOMINATOR) {
            return Err(DaoError::InvalidParameter(format!(
                "shares exceed 100% ({total} bps)"
            )));
        }
        self.shares = RevenueShares {
            staking_bps,
            burn_bps,
            dev_bps,
            version: self.shares.version + 1,
        };
        ctx.emit(
            self.address,
            Event::SharesUpdated {
                staking_bps,
                burn_bps,
                dev_bps,
            },
        );
        info!(splitter = %self.address, staking_bps, burn_bps, dev_bps, "shares updated");
        Ok(())
    }

    pub fn set_dev_wallet(
        &mut self,
        ctx: &mut ExecContext,
        caller: Address,
        wallet: Address,
    ) -> Result<()> {
        self.ownable.ensure_owner(caller)?;
        self.dev_wallet = wallet;
        ctx.emit(self.address, Event::DevWalletUpdated { wallet });
        Ok(())
    }

    pub fn set_staking_vault(
        &mut self,
        ctx: &mut ExecContext,
        caller: Address,
        vault: Address,
    ) -> Result<()> {
        self.ownable.ensure_owner(caller)?;
        self.staking_vault = vault;
        ctx.emit(self.address, Event::StakingVaultUpdated { vault });
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        ctx: &mut ExecContext,
        caller: Address,
        new_owner: Address,
    ) -> Result<()> {
        self.ownable
            .transfer_ownership(ctx, self.address, caller, new_owner)
    }

    pub fn renounce_ownership(&mut self, ctx: &mut ExecContext, caller: Address) -> Result<()> {
        self.ownable.renounce_ownership(ctx, self.address, caller)
    }
}
