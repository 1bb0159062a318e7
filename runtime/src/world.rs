//! The full contract state of one deployment

use dao_core::{checked_add, Address, Amount, DaoError, Env, Result, TokenLedger, H256};
use dao_economics::{RevenueSplitter, StakingVault, TaxToken};
use dao_governance::{Governor, ProposalState};
use dao_timelock::Timelock;
use dao_token::VotingToken;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every deployed contract plus the host's native-coin balances. Cloned
/// before each transaction so a failure can restore it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    pub voting_token: VotingToken,
    pub tax_token: TaxToken,
    pub vault: StakingVault,
    pub splitter: RevenueSplitter,
    pub timelock: Timelock,
    pub governor: Governor,
    pub native: BTreeMap<Address, Amount>,
}

impl World {
    /// Addresses of all contracts, in deployment order
    pub fn contracts(&self) -> [(&'static str, Address); 6] {
        [
            ("voting_token", self.voting_token.address()),
            ("timelock", self.timelock.address()),
            ("governor", self.governor.address()),
            ("tax_token", self.tax_token.address()),
            ("vault", self.vault.address()),
            ("splitter", self.splitter.address()),
        ]
    }

    pub fn is_contract(&self, address: Address) -> bool {
        self.contracts().iter().any(|(_, a)| *a == address)
    }

    pub fn native_balance(&self, account: Address) -> Amount {
        self.native.get(&account).copied().unwrap_or(0)
    }

    pub fn set_native_balance(&mut self, account: Address, amount: Amount) {
        if amount == 0 {
            self.native.remove(&account);
        } else {
            self.native.insert(account, amount);
        }
    }

    pub fn move_native(&mut self, from: Address, to: Address, amount: Amount) -> Result<()> {
        if amount == 0 || from == to {
            return Ok(());
        }
        let have = self.native_balance(from);
        if have < amount {
            return Err(DaoError::InsufficientFunds { have, need: amount });
        }
        let credited = checked_add(self.native_balance(to), amount)?;
        self.set_native_balance(from, have - amount);
        self.set_native_balance(to, credited);
        Ok(())
    }

    pub fn proposal_state(&self, env: &Env, id: H256) -> Result<ProposalState> {
        self.governor
            .state(env, &self.voting_token, &self.timelock, id)
    }

    /// Read access to whichever token lives at `address`
    pub fn ledger(&self, address: Address) -> Result<&dyn TokenLedger> {
        if address == self.voting_token.address() {
            Ok(&self.voting_token)
        } else if address == self.tax_token.address() {
            Ok(&self.tax_token)
        } else {
            Err(DaoError::UnknownTarget(address))
        }
    }
}

/// Mutable access to the token at `address`. Takes the two ledgers rather
/// than the world so callers can keep borrowing the other contracts.
pub(crate) fn ledger_mut<'a>(
    voting_token: &'a mut VotingToken,
    tax_token: &'a mut TaxToken,
    address: Address,
) -> Result<&'a mut dyn TokenLedger> {
    if address == voting_token.address() {
        Ok(voting_token)
    } else if address == tax_token.address() {
        Ok(tax_token)
    } else {
        Err(DaoError::UnknownTarget(address))
    }
}
