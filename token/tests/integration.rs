use dao_core::*;
use dao_crypto::KeyPair;
use dao_token::*;

const SUPPLY: Amount = 1_000_000 * UNIT;

struct Chain {
    block: BlockNumber,
}

impl Chain {
    fn ctx(&self) -> ExecContext {
        ExecContext::new(self.env())
    }

    fn env(&self) -> Env {
        Env::new(self.block, 1_700_000_000 + self.block * 3, 31337)
    }

    fn mine(&mut self) {
        self.block += 1;
    }
}

fn setup() -> (Chain, VotingToken, Address, Address, Address) {
    let chain = Chain { block: 1 };
    let deployer = Address::from_label("deployer");
    let alice = Address::from_label("alice");
    let bob = Address::from_label("bob");
    let mut ctx = chain.ctx();
    let token = VotingToken::new(
        &mut ctx,
        Address::from_label("dao-token"),
        "DAOToken",
        "DAO",
        deployer,
        SUPPLY,
    )
    .unwrap();
    (chain, token, deployer, alice, bob)
}

#[test]
fn test_transfer_moves_votes_between_delegates() {
    let (mut chain, mut token, deployer, alice, bob) = setup();
    chain.mine();
    let mut ctx = chain.ctx();
    token.delegate(&mut ctx, deployer, deployer).unwrap();
    token.transfer(&mut ctx, deployer, alice, 1_000 * UNIT).unwrap();
    token.delegate(&mut ctx, alice, bob).unwrap();

    assert_eq!(token.get_votes(deployer), SUPPLY - 1_000 * UNIT);
    assert_eq!(token.get_votes(bob), 1_000 * UNIT);
    assert_eq!(token.get_votes(alice), 0);

    chain.mine();
    let mut ctx = chain.ctx();
    token.transfer(&mut ctx, alice, deployer, 400 * UNIT).unwrap();
    assert_eq!(token.get_votes(bob), 600 * UNIT);
    assert_eq!(token.get_votes(deployer), SUPPLY - 600 * UNIT);
}

#[test]
fn test_past_votes_follow_checkpoints() {
    let (mut chain, mut token, deployer, alice, _) = setup();
    chain.mine(); // block 2
    let mut ctx = chain.ctx();
    token.delegate(&mut ctx, deployer, deployer).unwrap();
    let delegated_at = chain.block;

    chain.mine(); // block 3
    chain.mine(); // block 4
    let mut ctx = chain.ctx();
    token.transfer(&mut ctx, deployer, alice, 250_000 * UNIT).unwrap();
    let transferred_at = chain.block;

    chain.mine();
    chain.mine();
    let env = chain.env();
    assert_eq!(token.get_past_votes(&env, deployer, delegated_at - 1).unwrap(), 0);
    assert_eq!(token.get_past_votes(&env, deployer, delegated_at).unwrap(), SUPPLY);
    assert_eq!(token.get_past_votes(&env, deployer, transferred_at - 1).unwrap(), SUPPLY);
    assert_eq!(
        token.get_past_votes(&env, deployer, transferred_at).unwrap(),
        750_000 * UNIT
    );
    assert!(token.get_past_votes(&env, deployer, chain.block).is_err());
    assert_eq!(token.num_checkpoints(deployer), 2);
    assert_eq!(
        token.checkpoint(deployer, 1),
        Some(Checkpoint {
            block: transferred_at,
            votes: 750_000 * UNIT
        })
    );
}

#[test]
fn test_repeated_delegation_in_one_block_single_checkpoint() {
    let (mut chain, mut token, deployer, alice, _) = setup();
    chain.mine();
    let mut ctx = chain.ctx();
    token.delegate(&mut ctx, deployer, alice).unwrap();
    token.delegate(&mut ctx, deployer, deployer).unwrap();
    token.delegate(&mut ctx, deployer, alice).unwrap();
    assert_eq!(token.num_checkpoints(alice), 1);
    assert_eq!(token.num_checkpoints(deployer), 1);
    assert_eq!(token.get_votes(alice), SUPPLY);
}

#[test]
fn test_transfer_from_respects_allowance() {
    let (chain, mut token, deployer, alice, bob) = setup();
    let mut ctx = chain.ctx();
    token.approve(&mut ctx, deployer, alice, 100 * UNIT).unwrap();
    token
        .transfer_from(&mut ctx, alice, deployer, bob, 60 * UNIT)
        .unwrap();
    assert_eq!(token.balance_of(bob), 60 * UNIT);
    assert_eq!(token.allowance(deployer, alice), 40 * UNIT);

    let err = token
        .transfer_from(&mut ctx, alice, deployer, bob, 41 * UNIT)
        .unwrap_err();
    assert!(matches!(err, DaoError::InsufficientAllowance { .. }));
    assert_eq!(token.balance_of(bob), 60 * UNIT);
}

#[test]
fn test_insufficient_balance() {
    let (chain, mut token, _, alice, bob) = setup();
    let mut ctx = chain.ctx();
    assert_eq!(
        token.transfer(&mut ctx, alice, bob, 1),
        Err(DaoError::InsufficientFunds { have: 0, need: 1 })
    );
}

#[test]
fn test_conservation_over_transfers() {
    let (chain, mut token, deployer, alice, bob) = setup();
    let mut ctx = chain.ctx();
    for (i, to) in [alice, bob, alice, bob].into_iter().enumerate() {
        token
            .transfer(&mut ctx, deployer, to, (i as Amount + 1) * 7 * UNIT)
            .unwrap();
    }
    token.transfer(&mut ctx, alice, bob, 3 * UNIT).unwrap();
    assert_eq!(token.balances().sum_of_balances(), token.total_supply());
}

#[test]
fn test_permit_then_transfer_from() {
    let (chain, mut token, deployer, _, bob) = setup();
    let owner_key = KeyPair::from_seed("holder");
    let owner = owner_key.address();
    let mut ctx = chain.ctx();
    token.transfer(&mut ctx, deployer, owner, 10 * UNIT).unwrap();

    let deadline = ctx.timestamp() + 60;
    let nonce = token.nonces(owner);
    let digest = token.permit_digest(ctx.env.chain_id, owner, bob, 10 * UNIT, nonce, deadline);
    let sig = owner_key.sign(digest.as_bytes());
    token
        .permit(&mut ctx, owner, bob, 10 * UNIT, deadline, &owner_key.public_key_bytes(), &sig)
        .unwrap();
    token
        .transfer_from(&mut ctx, bob, owner, bob, 10 * UNIT)
        .unwrap();
    assert_eq!(token.balance_of(bob), 10 * UNIT);
    assert_eq!(token.nonces(owner), 1);
}
