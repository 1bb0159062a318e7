//! Ledger traits and the balance/allowance book shared by both tokens

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::env::{Env, ExecContext};
use crate::error::{DaoError, Result};
use crate::event::Event;
use crate::math::{checked_add, checked_sub};
use crate::types::{Address, Amount, BlockNumber};

/// Fungible-token surface the vault and splitter move funds through
pub trait TokenLedger {
    fn address(&self) -> Address;

    fn total_supply(&self) -> Amount;

    fn balance_of(&self, account: Address) -> Amount;

    fn allowance(&self, owner: Address, spender: Address) -> Amount;

    fn transfer(
        &mut self,
        ctx: &mut ExecContext,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()>;

    fn approve(
        &mut self,
        ctx: &mut ExecContext,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<()>;

    /// Moves `amount` from `from` to `to` on behalf of `spender`, consuming
    /// allowance.
    fn transfer_from(
        &mut self,
        ctx: &mut ExecContext,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()>;
}

/// Historical voting power, read by the governor
pub trait Votes {
    /// Current voting power
    fn get_votes(&self, account: Address) -> Amount;

    /// Voting power at the end of `block`; `block` must already be mined
    fn get_past_votes(&self, env: &Env, account: Address, block: BlockNumber) -> Result<Amount>;

    fn get_past_total_supply(&self, env: &Env, block: BlockNumber) -> Result<Amount>;
}

/// Balances and allowances of one fixed-supply token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    total_supply: Amount,
    balances: BTreeMap<Address, Amount>,
    allowances: BTreeMap<Address, BTreeMap<Address, Amount>>,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn balance_of(&self, account: Address) -> Amount {
        self.balances.get(&account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> Amount {
        self.allowances
            .get(&owner)
            .and_then(|m| m.get(&spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn holders(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter()
    }

    /// Sum of every balance; equals `total_supply` at every boundary
    pub fn sum_of_balances(&self) -> Amount {
        self.balances.values().sum()
    }

    /// Genesis issuance; the only way supply is created
    pub fn mint(&mut self, to: Address, amount: Amount) -> Result<()> {
        if to.is_zero() {
            return Err(DaoError::InvalidParameter(
                "mint to the zero address".to_string(),
            ));
        }
        self.total_supply = checked_add(self.total_supply, amount)?;
        self.credit(to, amount)
    }

    pub fn ensure_balance(&self, account: Address, amount: Amount) -> Result<()> {
        let have = self.balance_of(account);
        if have < amount {
            return Err(DaoError::InsufficientFunds { have, need: amount });
        }
        Ok(())
    }

    pub fn debit(&mut self, account: Address, amount: Amount) -> Result<()> {
        self.ensure_balance(account, amount)?;
        let remaining = checked_sub(self.balance_of(account), amount)?;
        if remaining == 0 {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, remaining);
        }
        Ok(())
    }

    pub fn credit(&mut self, account: Address, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let balance = checked_add(self.balance_of(account), amount)?;
        self.balances.insert(account, balance);
        Ok(())
    }

    pub fn approve(
        &mut self,
        ctx: &mut ExecContext,
        emitter: Address,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<()> {
        if owner.is_zero() || spender.is_zero() {
            return Err(DaoError::InvalidParameter(
                "approve involving the zero address".to_string(),
            ));
        }
        self.set_allowance(owner, spender, amount);
        ctx.emit(
            emitter,
            Event::Approval {
                owner,
                spender,
                amount,
            },
        );
        Ok(())
    }

    /// Consumes allowance; `Amount::MAX` is treated as infinite
    pub fn spend_allowance(&mut self, owner: Address, spender: Address, amount: Amount) -> Result<()> {
        let current = self.allowance(owner, spender);
        if current == Amount::MAX {
            return Ok(());
        }
        if current < amount {
            return Err(DaoError::InsufficientAllowance {
                have: current,
                need: amount,
            });
        }
        self.set_allowance(owner, spender, current - amount);
        Ok(())
    }

    fn set_allowance(&mut self, owner: Address, spender: Address, amount: Amount) {
        if amount == 0 {
            if let Some(m) = self.allowances.get_mut(&owner) {
                m.remove(&spender);
                if m.is_empty() {
                    self.allowances.remove(&owner);
                }
            }
        } else {
            self.allowances
                .entry(owner)
                .or_default()
                .insert(spender, amount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ExecContext {
        ExecContext::new(Env::new(1, 1_000, 31337))
    }

    #[test]
    fn test_mint_and_move() {
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut book = Balances::new();
        book.mint(alice, 100).unwrap();

        book.debit(alice, 40).unwrap();
        book.credit(bob, 40).unwrap();
        assert_eq!(book.balance_of(alice), 60);
        assert_eq!(book.balance_of(bob), 40);
        assert_eq!(book.sum_of_balances(), book.total_supply());

        assert_eq!(
            book.debit(bob, 41),
            Err(DaoError::InsufficientFunds { have: 40, need: 41 })
        );
    }

    #[test]
    fn test_allowance_spend() {
        let mut ctx = ctx();
        let token = Address::from_label("token");
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut book = Balances::new();

        book.approve(&mut ctx, token, alice, bob, 50).unwrap();
        book.spend_allowance(alice, bob, 20).unwrap();
        assert_eq!(book.allowance(alice, bob), 30);
        assert_eq!(
            book.spend_allowance(alice, bob, 31),
            Err(DaoError::InsufficientAllowance { have: 30, need: 31 })
        );

        book.approve(&mut ctx, token, alice, bob, Amount::MAX).unwrap();
        book.spend_allowance(alice, bob, 1_000).unwrap();
        assert_eq!(book.allowance(alice, bob), Amount::MAX);
    }

    #[test]
    fn test_approve_rejects_zero_spender() {
        let mut ctx = ctx();
        let mut book = Balances::new();
        let err = book
            .approve(&mut ctx, Address::BURN, Address::from_label("a"), Address::ZERO, 1)
            .unwrap_err();
        assert!(matches!(err, DaoError::InvalidParameter(_)));
    }
}
