//! Ownership and role-based capability sets

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::env::ExecContext;
use crate::error::{DaoError, Result};
use crate::event::Event;
use crate::types::Address;

/// Single-owner gate used by the tax engine, vault and splitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownable {
    owner: Address,
}

impl Ownable {
    pub fn new(ctx: &mut ExecContext, emitter: Address, owner: Address) -> Self {
        ctx.emit(
            emitter,
            Event::OwnershipTransferred {
                previous_owner: Address::ZERO,
                new_owner: owner,
            },
        );
        Self { owner }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn ensure_owner(&self, caller: Address) -> Result<()> {
        if caller != self.owner {
            return Err(DaoError::AccessDenied(format!(
                "{caller} is not the owner"
            )));
        }
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        ctx: &mut ExecContext,
        emitter: Address,
        caller: Address,
        new_owner: Address,
    ) -> Result<()> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(DaoError::InvalidParameter(
                "new owner is the zero address".to_string(),
            ));
        }
        self.set_owner(ctx, emitter, new_owner);
        Ok(())
    }

    /// Leaves the contract without an owner; every owner-gated setter is
    /// permanently disabled afterwards.
    pub fn renounce_ownership(
        &mut self,
        ctx: &mut ExecContext,
        emitter: Address,
        caller: Address,
    ) -> Result<()> {
        self.ensure_owner(caller)?;
        self.set_owner(ctx, emitter, Address::ZERO);
        Ok(())
    }

    fn set_owner(&mut self, ctx: &mut ExecContext, emitter: Address, new_owner: Address) {
        let previous_owner = std::mem::replace(&mut self.owner, new_owner);
        tracing::info!(
            contract = %emitter,
            previous = %previous_owner,
            new = %new_owner,
            "ownership transferred"
        );
        ctx.emit(
            emitter,
            Event::OwnershipTransferred {
                previous_owner,
                new_owner,
            },
        );
    }
}

/// Capabilities held on the timelock
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimelockRole {
    Admin,
    Proposer,
    Executor,
    Canceller,
}

impl fmt::Display for TimelockRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimelockRole::Admin => "admin",
            TimelockRole::Proposer => "proposer",
            TimelockRole::Executor => "executor",
            TimelockRole::Canceller => "canceller",
        };
        f.write_str(s)
    }
}

/// Mapping from role tag to the set of identities holding it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoritySet {
    members: BTreeMap<TimelockRole, BTreeSet<Address>>,
}

impl AuthoritySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the account was not already a member
    pub fn add(&mut self, role: TimelockRole, account: Address) -> bool {
        self.members.entry(role).or_default().insert(account)
    }

    /// Returns true if the account was a member
    pub fn remove(&mut self, role: TimelockRole, account: Address) -> bool {
        let removed = self
            .members
            .get_mut(&role)
            .map(|set| set.remove(&account))
            .unwrap_or(false);
        if self.members.get(&role).is_some_and(BTreeSet::is_empty) {
            self.members.remove(&role);
        }
        removed
    }

    pub fn has_role(&self, role: TimelockRole, account: Address) -> bool {
        self.members
            .get(&role)
            .is_some_and(|set| set.contains(&account))
    }

    /// Like `has_role`, but a grant to the zero address opens the role to
    /// everyone. The wildcard is checked first.
    pub fn has_role_or_open(&self, role: TimelockRole, account: Address) -> bool {
        self.has_role(role, Address::ZERO) || self.has_role(role, account)
    }

    pub fn members(&self, role: TimelockRole) -> impl Iterator<Item = &Address> {
        self.members.get(&role).into_iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Env;

    fn ctx() -> ExecContext {
        ExecContext::new(Env::new(1, 1_000, 31337))
    }

    #[test]
    fn test_ownable_gate() {
        let mut ctx = ctx();
        let contract = Address::from_label("contract");
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut ownable = Ownable::new(&mut ctx, contract, alice);

        assert!(ownable.ensure_owner(alice).is_ok());
        assert!(matches!(
            ownable.ensure_owner(bob),
            Err(DaoError::AccessDenied(_))
        ));

        assert!(ownable
            .transfer_ownership(&mut ctx, contract, bob, bob)
            .is_err());
        assert!(ownable
            .transfer_ownership(&mut ctx, contract, alice, Address::ZERO)
            .is_err());
        ownable
            .transfer_ownership(&mut ctx, contract, alice, bob)
            .unwrap();
        assert_eq!(ownable.owner(), bob);
        assert_eq!(
            ctx.events().last().unwrap().event,
            Event::OwnershipTransferred {
                previous_owner: alice,
                new_owner: bob
            }
        );
    }

    #[test]
    fn test_renounce_disables_owner() {
        let mut ctx = ctx();
        let contract = Address::from_label("contract");
        let alice = Address::from_label("alice");
        let mut ownable = Ownable::new(&mut ctx, contract, alice);
        ownable.renounce_ownership(&mut ctx, contract, alice).unwrap();
        assert_eq!(ownable.owner(), Address::ZERO);
        assert!(ownable.ensure_owner(alice).is_err());
    }

    #[test]
    fn test_authority_set_membership() {
        let mut roles = AuthoritySet::new();
        let gov = Address::from_label("governor");

        assert!(roles.add(TimelockRole::Proposer, gov));
        assert!(!roles.add(TimelockRole::Proposer, gov));
        assert!(roles.has_role(TimelockRole::Proposer, gov));
        assert!(!roles.has_role(TimelockRole::Canceller, gov));

        assert!(roles.remove(TimelockRole::Proposer, gov));
        assert!(!roles.remove(TimelockRole::Proposer, gov));
        assert!(!roles.has_role(TimelockRole::Proposer, gov));
    }

    #[test]
    fn test_open_role_wildcard() {
        let mut roles = AuthoritySet::new();
        let anyone = Address::from_label("anyone");
        assert!(!roles.has_role_or_open(TimelockRole::Executor, anyone));

        roles.add(TimelockRole::Executor, Address::ZERO);
        assert!(roles.has_role_or_open(TimelockRole::Executor, anyone));
        assert!(!roles.has_role(TimelockRole::Executor, anyone));
    }
}
