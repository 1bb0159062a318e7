//! Staking vault: stake the voting token, earn the tax token
//!
//! Rewards use a reward-per-token accumulator scaled by 1e18. Every
//! interaction first settles the caller's pending reward against the current
//! accumulator, so funding and claiming are O(1) regardless of staker count.
//!
//! Each entry point finishes its own bookkeeping before calling the token
//! ledger. If that call fails the enclosing transaction rolls the vault back.

use dao_core::{
    checked_add, mul_div, Address, Amount, DaoError, Event, ExecContext, Ownable, Result,
    Timestamp, TokenLedger, PRECISION,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::constants::DEFAULT_MIN_LOCK_PERIOD;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakePosition {
    pub staked: Amount,
    /// Reset on every additional stake
    pub stake_timestamp: Timestamp,
    pub reward_per_token_paid: Amount,
    pub accrued: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingVault {
    address: Address,
    staking_token: Address,
    reward_token: Address,
    ownable: Ownable,
    min_lock_period: u64,
    total_staked: Amount,
    reward_per_token_stored: Amount,
    positions: BTreeMap<Address, StakePosition>,
}

impl StakingVault {
    pub fn new(
        ctx: &mut ExecContext,
        address: Address,
        staking_token: Address,
        reward_token: Address,
        owner: Address,
    ) -> Self {
        info!(vault = %address, %staking_token, %reward_token, "staking vault deployed");
        Self {
            address,
            staking_token,
            reward_token,
            ownable: Ownable::new(ctx, address, owner),
            min_lock_period: DEFAULT_MIN_LOCK_PERIOD,
            total_staked: 0,
            reward_per_token_stored: 0,
            positions: BTreeMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn staking_token(&self) -> Address {
        self.staking_token
    }

    pub fn reward_token(&self) -> Address {
        self.reward_token
    }

    pub fn owner(&self) -> Address {
        self.ownable.owner()
    }

    pub fn min_lock_period(&self) -> u64 {
        self.min_lock_period
    }

    pub fn total_staked(&self) -> Amount {
        self.total_staked
    }

    pub fn reward_per_token_stored(&self) -> Amount {
        self.reward_per_token_stored
    }

    pub fn position(&self, account: Address) -> Option<&StakePosition> {
        self.positions.get(&account)
    }

    pub fn staked_balance(&self, account: Address) -> Amount {
        self.position(account).map(|p| p.staked).unwrap_or(0)
    }

    pub fn stake_timestamp(&self, account: Address) -> Timestamp {
        self.position(account).map(|p| p.stake_timestamp).unwrap_or(0)
    }

    pub fn unlocks_at(&self, account: Address) -> Timestamp {
        self.stake_timestamp(account)
            .saturating_add(self.min_lock_period)
    }

    /// Settled plus pending rewards of `account`
    pub fn earned(&self, account: Address) -> Result<Amount> {
        match self.position(account) {
            Some(p) => {
                let pending = mul_div(
                    p.staked,
                    self.reward_per_token_stored - p.reward_per_token_paid,
                    PRECISION,
                )?;
                checked_add(p.accrued, pending)
            }
            None => Ok(0),
        }
    }

    pub fn stake<S: TokenLedger + ?Sized>(
        &mut self,
        ctx: &mut ExecContext,
        staking: &mut S,
        user: Address,
        amount: Amount,
    ) -> Result<()> {
        if amount == 0 {
            return Err(DaoError::InvalidParameter("cannot stake 0".to_string()));
        }
        self.ensure_ledger(staking, self.staking_token)?;
        self.sync(user)?;

        let total_staked = checked_add(self.total_staked, amount)?;
        let position = self.positions.entry(user).or_default();
        position.staked = checked_add(position.staked, amount)?;
        position.stake_timestamp = ctx.timestamp();
        self.total_staked = total_staked;
        ctx.emit(self.address, Event::Staked { user, amount });
        debug!(vault = %self.address, %user, amount, total = self.total_staked, "staked");

        staking.transfer_from(ctx, self.address, user, self.address, amount)
    }

    /// Withdraws principal; accrued rewards stay banked for a later claim
    pub fn withdraw<S: TokenLedger + ?Sized>(
        &mut self,
        ctx: &mut ExecContext,
        staking: &mut S,
        user: Address,
        amount: Amount,
    ) -> Result<()> {
        if amount == 0 {
            return Err(DaoError::InvalidParameter("cannot withdraw 0".to_string()));
        }
        self.ensure_ledger(staking, self.staking_token)?;
        let unlocks_at = self.unlocks_at(user);
        if ctx.timestamp() < unlocks_at {
            return Err(DaoError::LockNotElapsed { unlocks_at });
        }
        let have = self.staked_balance(user);
        if amount > have {
            return Err(DaoError::InsufficientFunds { have, need: amount });
        }
        self.sync(user)?;

        if let Some(position) = self.positions.get_mut(&user) {
            position.staked -= amount;
        }
        self.total_staked -= amount;
        ctx.emit(self.address, Event::Withdrawn { user, amount });
        debug!(vault = %self.address, %user, amount, total = self.total_staked, "withdrawn");

        staking.transfer(ctx, self.address, user, amount)
    }

    pub fn claim_rewards<R: TokenLedger + ?Sized>(
        &mut self,
        ctx: &mut ExecContext,
        rewards: &mut R,
        user: Address,
    ) -> Result<Amount> {
        self.ensure_ledger(rewards, self.reward_token)?;
        self.sync(user)?;
        let reward = match self.positions.get_mut(&user) {
            Some(position) if position.accrued > 0 => std::mem::take(&mut position.accrued),
            _ => return Err(DaoError::NothingToClaim),
        };
        ctx.emit(
            self.address,
            Event::RewardsClaimed {
                user,
                amount: reward,
            },
        );
        info!(vault = %self.address, %user, reward, "rewards claimed");

        rewards.transfer(ctx, self.address, user, reward)?;
        Ok(reward)
    }

    /// Pulls `amount` of the reward token from `funder` (which must have
    /// approved the vault). With nothing staked the accumulator is left
    /// unchanged and the funds stay in the vault unattributed.
    pub fn add_rewards<R: TokenLedger + ?Sized>(
        &mut self,
        ctx: &mut ExecContext,
        rewards: &mut R,
        funder: Address,
        amount: Amount,
    ) -> Result<()> {
        if amount == 0 {
            return Err(DaoError::InvalidParameter("cannot add 0 rewards".to_string()));
        }
        self.ensure_ledger(rewards, self.reward_token)?;
        if self.total_staked > 0 {
            let increment = mul_div(amount, PRECISION, self.total_staked)?;
            self.reward_per_token_stored =
                checked_add(self.reward_per_token_stored, increment)?;
        }
        ctx.emit(
            self.address,
            Event::RewardsAdded {
                amount,
                reward_per_token: self.reward_per_token_stored,
            },
        );
        info!(
            vault = %self.address,
            %funder,
            amount,
            reward_per_token = self.reward_per_token_stored,
            "rewards added"
        );

        rewards.transfer_from(ctx, self.address, funder, self.address, amount)
    }

    pub fn set_min_lock_period(
        &mut self,
        ctx: &mut ExecContext,
        caller: Address,
        period: u64,
    ) -> Result<()> {
        self.ownable.ensure_owner(caller)?;
        self.min_lock_period = period;
        ctx.emit(self.address, Event::MinLockPeriodUpdated { period });
        info!(vault = %self.address, period, "min lock period updated");
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

    /// Banks pending rewards and moves the user's snapshot to the current
    /// accumulator value.
    fn sync(&mut self, user: Address) -> Result<()> {
        let earned = self.earned(user)?;
        let rpt = self.reward_per_token_stored;
        let position = self.positions.entry(user).or_default();
        position.accrued = earned;
        position.reward_per_token_paid = rpt;
        Ok(())
    }

    fn ensure_ledger<L: TokenLedger + ?Sized>(&self, ledger: &L, expected: Address) -> Result<()> {
        if ledger.address() != expected {
            return Err(DaoError::InvalidParameter(format!(
                "vault {} expects token {expected}, got {}",
                self.address,
                ledger.address()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax_token::TaxToken;
    use dao_core::{time, Env, UNIT};

    struct Fixture {
        ctx: ExecContext,
        stake_token: TaxToken,
        reward_token: TaxToken,
        vault: StakingVault,
        owner: Address,
        alice: Address,
        bob: Address,
    }

    fn fixture() -> Fixture {
        let mut ctx = ExecContext::new(Env::new(1, 1_000_000, 31337));
        let owner = Address::from_label("owner");
        let vault_addr = Address::from_label("vault");
        let mut stake_token = TaxToken::new(
            &mut ctx,
            Address::from_label("stake"),
            "Stake",
            "STK",
            owner,
            1_000_000 * UNIT,
        )
        .unwrap();
        let mut reward_token = TaxToken::new(
            &mut ctx,
            Address::from_label("reward"),
            "Reward",
            "RWD",
            owner,
            1_000_000 * UNIT,
        )
        .unwrap();
        for token in [&mut stake_token, &mut reward_token] {
            token.set_trading_enabled(&mut ctx, owner, true).unwrap();
            token.set_tax_exempt(&mut ctx, owner, vault_addr, true).unwrap();
            token.set_limit_exempt(&mut ctx, owner, vault_addr, true).unwrap();
            token
                .set_max_wallet_amount(&mut ctx, owner, Amount::MAX)
                .unwrap();
            token
                .set_max_transaction_amount(&mut ctx, owner, Amount::MAX)
                .unwrap();
        }
        let vault = StakingVault::new(
            &mut ctx,
            vault_addr,
            stake_token.address(),
            reward_token.address(),
            owner,
        );
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        for user in [alice, bob] {
            stake_token
                .transfer(&mut ctx, owner, user, 100_000 * UNIT)
                .unwrap();
            stake_token
                .approve(&mut ctx, user, vault_addr, Amount::MAX)
                .unwrap();
        }
        reward_token
            .approve(&mut ctx, owner, vault_addr, Amount::MAX)
            .unwrap();
        Fixture {
            ctx,
            stake_token,
            reward_token,
            vault,
            owner,
            alice,
            bob,
        }
    }

    #[test]
    fn test_stake_rejects_zero() {
        let mut f = fixture();
        assert!(matches!(
            f.vault.stake(&mut f.ctx, &mut f.stake_token, f.alice, 0),
            Err(DaoError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_reward_per_token_scaling() {
        let mut f = fixture();
        f.vault
            .stake(&mut f.ctx, &mut f.stake_token, f.alice, 10_000 * UNIT)
            .unwrap();
        f.vault
            .add_rewards(&mut f.ctx, &mut f.reward_token, f.owner, 1_000 * UNIT)
            .unwrap();
        assert_eq!(f.vault.reward_per_token_stored(), PRECISION / 10);
        assert_eq!(f.vault.earned(f.alice).unwrap(), 1_000 * UNIT);
    }

    #[test]
    fn test_proportional_split() {
        let mut f = fixture();
        f.vault
            .stake(&mut f.ctx, &mut f.stake_token, f.alice, 75_000 * UNIT)
            .unwrap();
        f.vault
            .stake(&mut f.ctx, &mut f.stake_token, f.bob, 25_000 * UNIT)
            .unwrap();
        f.vault
            .add_rewards(&mut f.ctx, &mut f.reward_token, f.owner, 1_000 * UNIT)
            .unwrap();
        assert_eq!(f.vault.earned(f.alice).unwrap(), 750 * UNIT);
        assert_eq!(f.vault.earned(f.bob).unwrap(), 250 * UNIT);
    }

    #[test]
    fn test_withdraw_lock_and_balance_checks() {
        let mut f = fixture();
        f.vault
            .stake(&mut f.ctx, &mut f.stake_token, f.alice, 1_000 * UNIT)
            .unwrap();
        let unlocks_at = f.ctx.timestamp() + time::WEEK;
        assert_eq!(
            f.vault
                .withdraw(&mut f.ctx, &mut f.stake_token, f.alice, UNIT),
            Err(DaoError::LockNotElapsed { unlocks_at })
        );

        f.ctx.env.timestamp = unlocks_at;
        assert!(matches!(
            f.vault
                .withdraw(&mut f.ctx, &mut f.stake_token, f.alice, 1_001 * UNIT),
            Err(DaoError::InsufficientFunds { .. })
        ));
        f.vault
            .withdraw(&mut f.ctx, &mut f.stake_token, f.alice, 400 * UNIT)
            .unwrap();
        assert_eq!(f.vault.staked_balance(f.alice), 600 * UNIT);
        assert_eq!(f.stake_token.balance_of(f.alice), 99_400 * UNIT);
    }

    #[test]
    fn test_rewards_with_no_stakers_are_stranded() {
        let mut f = fixture();
        f.vault
            .add_rewards(&mut f.ctx, &mut f.reward_token, f.owner, 500 * UNIT)
            .unwrap();
        assert_eq!(f.vault.reward_per_token_stored(), 0);
        assert_eq!(f.reward_token.balance_of(f.vault.address()), 500 * UNIT);

        f.vault
            .stake(&mut f.ctx, &mut f.stake_token, f.alice, 1_000 * UNIT)
            .unwrap();
        assert_eq!(f.vault.earned(f.alice).unwrap(), 0);
    }

    #[test]
    fn test_claim_pays_and_resets() {
        let mut f = fixture();
        f.vault
            .stake(&mut f.ctx, &mut f.stake_token, f.alice, 1_000 * UNIT)
            .unwrap();
        assert_eq!(
            f.vault
                .claim_rewards(&mut f.ctx, &mut f.reward_token, f.alice),
            Err(DaoError::NothingToClaim)
        );
        f.vault
            .add_rewards(&mut f.ctx, &mut f.reward_token, f.owner, 100 * UNIT)
            .unwrap();
        let paid = f
            .vault
            .claim_rewards(&mut f.ctx, &mut f.reward_token, f.alice)
            .unwrap();
        assert_eq!(paid, 100 * UNIT);
        assert_eq!(f.reward_token.balance_of(f.alice), 100 * UNIT);
        assert_eq!(f.vault.earned(f.alice).unwrap(), 0);
    }

    #[test]
    fn test_wrong_ledger_rejected() {
        let mut f = fixture();
        assert!(matches!(
            f.vault
                .stake(&mut f.ctx, &mut f.reward_token, f.alice, UNIT),
            Err(DaoError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_min_lock_period_owner_only() {
        let mut f = fixture();
        assert!(f
            .vault
            .set_min_lock_period(&mut f.ctx, f.alice, 0)
            .is_err());
        f.vault
            .set_min_lock_period(&mut f.ctx, f.owner, 3 * time::DAY)
            .unwrap();
        assert_eq!(f.vault.min_lock_period(), 3 * time::DAY);
        assert_eq!(
            f.ctx.events().last().unwrap().event,
            Event::MinLockPeriodUpdated { period: 3 * time::DAY }
        );
    }
}
