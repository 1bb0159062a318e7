//! Fixed-supply governance token with delegated, checkpointed voting power

use dao_core::{
    amount_word, keccak256, keccak_concat, Address, Amount, Balances, BlockNumber, DaoError, Env,
    Event, ExecContext, Result, TokenLedger, Votes, H256,
};
use dao_crypto::{address_from_public_key, KeyPair};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::checkpoints::{Checkpoint, Checkpoints};

/// Signing-domain version for permits
pub const PERMIT_VERSION: &str = "1";

const DOMAIN_TYPE: &[u8] =
    b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
const PERMIT_TYPE: &[u8] =
    b"Permit(address owner,address spender,uint256 value,uint256 nonce,uint256 deadline)";

fn address_word(address: Address) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[12..].copy_from_slice(address.as_bytes());
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingToken {
    address: Address,
    name: String,
    symbol: String,
    book: Balances,
    /// Absent entry means "no delegate": the holder's balance counts for nobody
    delegates: BTreeMap<Address, Address>,
    checkpoints: BTreeMap<Address, Checkpoints>,
    total_supply_checkpoints: Checkpoints,
    nonces: BTreeMap<Address, u64>,
}

impl VotingToken {
    /// Deploys the token and mints the whole supply to `holder`
    pub fn new(
        ctx: &mut ExecContext,
        address: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
        holder: Address,
        supply: Amount,
    ) -> Result<Self> {
        let mut token = Self {
            address,
            name: name.into(),
            symbol: symbol.into(),
            book: Balances::new(),
            delegates: BTreeMap::new(),
            checkpoints: BTreeMap::new(),
            total_supply_checkpoints: Checkpoints::new(),
            nonces: BTreeMap::new(),
        };
        token.book.mint(holder, supply)?;
        token.total_supply_checkpoints.push(ctx.block(), supply)?;
        ctx.emit(
            address,
            Event::Transfer {
                from: Address::ZERO,
                to: holder,
                amount: supply,
            },
        );
        info!(token = %address, symbol = %token.symbol, %holder, supply, "voting token deployed");
        Ok(token)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        18
    }

    pub fn balances(&self) -> &Balances {
        &self.book
    }

    /// Current delegate of `account`, `Address::ZERO` when none
    pub fn delegates(&self, account: Address) -> Address {
        self.delegates.get(&account).copied().unwrap_or(Address::ZERO)
    }

    /// Points the delegator's whole balance at `delegatee`. Delegating to the
    /// zero address withdraws the voting power.
    pub fn delegate(
        &mut self,
        ctx: &mut ExecContext,
        delegator: Address,
        delegatee: Address,
    ) -> Result<()> {
        let from_delegate = self.delegates(delegator);
        if delegatee.is_zero() {
            self.delegates.remove(&delegator);
        } else {
            self.delegates.insert(delegator, delegatee);
        }
        ctx.emit(
            self.address,
            Event::DelegateChanged {
                delegator,
                from_delegate,
                to_delegate: delegatee,
            },
        );
        info!(%delegator, from = %from_delegate, to = %delegatee, "delegate changed");
        let weight = self.book.balance_of(delegator);
        self.move_voting_power(ctx, from_delegate, delegatee, weight)
    }

    pub fn num_checkpoints(&self, account: Address) -> usize {
        self.checkpoints.get(&account).map(Checkpoints::len).unwrap_or(0)
    }

    pub fn checkpoint(&self, account: Address, pos: usize) -> Option<Checkpoint> {
        self.checkpoints.get(&account).and_then(|c| c.get(pos))
    }

    pub fn nonces(&self, owner: Address) -> u64 {
        self.nonces.get(&owner).copied().unwrap_or(0)
    }

    pub fn domain_separator(&self, chain_id: u64) -> H256 {
        keccak_concat(&[
            keccak256(DOMAIN_TYPE).as_bytes(),
            keccak256(self.name.as_bytes()).as_bytes(),
            keccak256(PERMIT_VERSION.as_bytes()).as_bytes(),
            &amount_word(Amount::from(chain_id)),
            &address_word(self.address),
        ])
    }

    /// Message an owner signs to authorize `spender` for `value`
    pub fn permit_digest(
        &self,
        chain_id: u64,
        owner: Address,
        spender: Address,
        value: Amount,
        nonce: u64,
        deadline: u64,
    ) -> H256 {
        let struct_hash = keccak_concat(&[
            keccak256(PERMIT_TYPE).as_bytes(),
            &address_word(owner),
            &address_word(spender),
            &amount_word(value),
            &amount_word(Amount::from(nonce)),
            &amount_word(Amount::from(deadline)),
        ]);
        keccak_concat(&[
            b"\x19\x01",
            self.domain_separator(chain_id).as_bytes(),
            struct_hash.as_bytes(),
        ])
    }

    /// Gasless approval: sets `owner`'s allowance for `spender` from a
    /// signature over the current nonce.
    #[allow(clippy::too_many_arguments)]
    pub fn permit(
        &mut self,
        ctx: &mut ExecContext,
        owner: Address,
        spender: Address,
        value: Amount,
        deadline: u64,
        public_key: &[u8],
        signature: &[u8],
    ) -> Result<()> {
        if ctx.timestamp() > deadline {
            return Err(DaoError::ExpiredSignature { deadline });
        }
        if address_from_public_key(public_key) != owner {
            return Err(DaoError::InvalidSignature);
        }
        let nonce = self.nonces(owner);
        let digest = self.permit_digest(ctx.env.chain_id, owner, spender, value, nonce, deadline);
        KeyPair::verify(public_key, digest.as_bytes(), signature)
            .map_err(|_| DaoError::InvalidSignature)?;

        self.nonces.insert(owner, nonce + 1);
        self.book.approve(ctx, self.address, owner, spender, value)
    }

    fn update(
        &mut self,
        ctx: &mut ExecContext,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        if from.is_zero() || to.is_zero() {
            return Err(DaoError::InvalidParameter(
                "transfer involving the zero address".to_string(),
            ));
        }
        self.book.debit(from, amount)?;
        self.book.credit(to, amount)?;
        ctx.emit(self.address, Event::Transfer { from, to, amount });
        debug!(token = %self.address, %from, %to, amount, "transfer");

        let (src, dst) = (self.delegates(from), self.delegates(to));
        self.move_voting_power(ctx, src, dst, amount)
    }

    fn move_voting_power(
        &mut self,
        ctx: &mut ExecContext,
        src: Address,
        dst: Address,
        amount: Amount,
    ) -> Result<()> {
        if src == dst || amount == 0 {
            return Ok(());
        }
        if !src.is_zero() {
            self.write_checkpoint(ctx, src, |votes| {
                votes.checked_sub(amount).ok_or(DaoError::Overflow)
            })?;
        }
        if !dst.is_zero() {
            self.write_checkpoint(ctx, dst, |votes| {
                votes.checked_add(amount).ok_or(DaoError::Overflow)
            })?;
        }
        Ok(())
    }

    fn write_checkpoint(
        &mut self,
        ctx: &mut ExecContext,
        delegate: Address,
        op: impl FnOnce(Amount) -> Result<Amount>,
    ) -> Result<()> {
        let checkpoints = self.checkpoints.entry(delegate).or_default();
        let new_votes = op(checkpoints.latest())?;
        let (previous_votes, new_votes) = checkpoints.push(ctx.block(), new_votes)?;
        ctx.emit(
            self.address,
            Event::DelegateVotesChanged {
                delegate,
                previous_votes,
                new_votes,
            },
        );
        Ok(())
    }
}

impl TokenLedger for VotingToken {
    fn address(&self) -> Address {
        self.address
    }

    fn total_supply(&self) -> Amount {
        self.book.total_supply()
    }

    fn balance_of(&self, account: Address) -> Amount {
        self.book.balance_of(account)
    }

    fn allowance(&self, owner: Address, spender: Address) -> Amount {
        self.book.allowance(owner, spender)
    }

    fn transfer(
        &mut self,
        ctx: &mut ExecContext,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        self.update(ctx, from, to, amount)
    }

    fn approve(
        &mut self,
        ctx: &mut ExecContext,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<()> {
        self.book.approve(ctx, self.address, owner, spender, amount)
    }

    fn transfer_from(
        &mut self,
        ctx: &mut ExecContext,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        self.book.ensure_balance(from, amount)?;
        self.book.spend_allowance(from, spender, amount)?;
        self.update(ctx, from, to, amount)
    }
}

impl Votes for VotingToken {
    fn get_votes(&self, account: Address) -> Amount {
        self.checkpoints
            .get(&account)
            .map(Checkpoints::latest)
            .unwrap_or(0)
    }

    fn get_past_votes(&self, env: &Env, account: Address, block: BlockNumber) -> Result<Amount> {
        ensure_past(env, block)?;
        Ok(self
            .checkpoints
            .get(&account)
            .map(|c| c.upper_lookup(block))
            .unwrap_or(0))
    }

    fn get_past_total_supply(&self, env: &Env, block: BlockNumber) -> Result<Amount> {
        ensure_past(env, block)?;
        Ok(self.total_supply_checkpoints.upper_lookup(block))
    }
}

fn ensure_past(env: &Env, block: BlockNumber) -> Result<()> {
    if block >= env.block {
        return Err(DaoError::InvalidBlock {
            requested: block,
            current: env.block,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dao_core::UNIT;

    const SUPPLY: Amount = 1_000_000 * UNIT;

    fn ctx_at(block: BlockNumber) -> ExecContext {
        ExecContext::new(Env::new(block, 1_000 + block * 3, 31337))
    }

    fn deploy(holder: Address) -> VotingToken {
        let mut ctx = ctx_at(1);
        VotingToken::new(&mut ctx, Address::from_label("dao-token"), "DAOToken", "DAO", holder, SUPPLY)
            .unwrap()
    }

    #[test]
    fn test_supply_minted_to_holder() {
        let deployer = Address::from_label("deployer");
        let token = deploy(deployer);
        assert_eq!(token.balance_of(deployer), SUPPLY);
        assert_eq!(token.total_supply(), SUPPLY);
        assert_eq!(token.decimals(), 18);
    }

    #[test]
    fn test_votes_require_self_delegation() {
        let deployer = Address::from_label("deployer");
        let mut token = deploy(deployer);
        assert_eq!(token.get_votes(deployer), 0);

        let mut ctx = ctx_at(2);
        token.delegate(&mut ctx, deployer, deployer).unwrap();
        assert_eq!(token.get_votes(deployer), SUPPLY);
        assert_eq!(token.delegates(deployer), deployer);
    }

    #[test]
    fn test_redelegation_moves_full_weight() {
        let deployer = Address::from_label("deployer");
        let alice = Address::from_label("alice");
        let mut token = deploy(deployer);
        let mut ctx = ctx_at(2);
        token.delegate(&mut ctx, deployer, deployer).unwrap();
        token.delegate(&mut ctx, deployer, alice).unwrap();
        assert_eq!(token.get_votes(deployer), 0);
        assert_eq!(token.get_votes(alice), SUPPLY);
        // both writes happened in block 2
        assert_eq!(token.num_checkpoints(deployer), 1);
    }

    #[test]
    fn test_zero_amount_transfer_emits_without_checkpoint() {
        let deployer = Address::from_label("deployer");
        let alice = Address::from_label("alice");
        let mut token = deploy(deployer);
        let mut ctx = ctx_at(2);
        token.delegate(&mut ctx, deployer, deployer).unwrap();
        let before = token.num_checkpoints(deployer);
        token.transfer(&mut ctx, deployer, alice, 0).unwrap();
        assert_eq!(token.num_checkpoints(deployer), before);
        assert!(matches!(
            ctx.events().last().unwrap().event,
            Event::Transfer { amount: 0, .. }
        ));
    }

    #[test]
    fn test_transfer_to_zero_rejected() {
        let deployer = Address::from_label("deployer");
        let mut token = deploy(deployer);
        let mut ctx = ctx_at(2);
        assert!(matches!(
            token.transfer(&mut ctx, deployer, Address::ZERO, 1),
            Err(DaoError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_past_votes_require_mined_block() {
        let deployer = Address::from_label("deployer");
        let token = deploy(deployer);
        let env = Env::new(5, 0, 31337);
        assert!(matches!(
            token.get_past_votes(&env, deployer, 5),
            Err(DaoError::InvalidBlock { requested: 5, current: 5 })
        ));
        assert_eq!(token.get_past_total_supply(&env, 4).unwrap(), SUPPLY);
        assert_eq!(token.get_past_total_supply(&env, 0).unwrap(), 0);
    }

    #[test]
    fn test_permit_sets_allowance_and_bumps_nonce() {
        let owner_key = KeyPair::from_seed("permit-owner");
        let owner = owner_key.address();
        let spender = Address::from_label("spender");
        let mut token = deploy(owner);
        let mut ctx = ctx_at(2);
        let deadline = ctx.timestamp() + 3_600;

        let digest = token.permit_digest(31337, owner, spender, 500, 0, deadline);
        let signature = owner_key.sign(digest.as_bytes());
        token
            .permit(&mut ctx, owner, spender, 500, deadline, &owner_key.public_key_bytes(), &signature)
            .unwrap();
        assert_eq!(token.allowance(owner, spender), 500);
        assert_eq!(token.nonces(owner), 1);

        // replaying the same signature fails: the nonce moved on
        assert_eq!(
            token.permit(&mut ctx, owner, spender, 500, deadline, &owner_key.public_key_bytes(), &signature),
            Err(DaoError::InvalidSignature)
        );
    }

    #[test]
    fn test_permit_rejects_expired_and_foreign_keys() {
        let owner_key = KeyPair::from_seed("permit-owner");
        let owner = owner_key.address();
        let spender = Address::from_label("spender");
        let mut token = deploy(owner);
        let mut ctx = ctx_at(2);
        let expired = ctx.timestamp() - 1;

        let digest = token.permit_digest(31337, owner, spender, 1, 0, expired);
        let signature = owner_key.sign(digest.as_bytes());
        assert_eq!(
            token.permit(&mut ctx, owner, spender, 1, expired, &owner_key.public_key_bytes(), &signature),
            Err(DaoError::ExpiredSignature { deadline: expired })
        );

        let mallory = KeyPair::from_seed("mallory");
        let deadline = ctx.timestamp() + 10;
        let digest = token.permit_digest(31337, owner, spender, 1, 0, deadline);
        let forged = mallory.sign(digest.as_bytes());
        assert_eq!(
            token.permit(&mut ctx, owner, spender, 1, deadline, &mallory.public_key_bytes(), &forged),
            Err(DaoError::InvalidSignature)
        );
        assert_eq!(token.nonces(owner), 0);
    }
}
