//! Command implementations over a loaded runtime
//!
//! Each mutating command is a single transaction; on failure the runtime is
//! left as it was and the caller does not save it.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use dao_core::{
    keccak256, Action, Address, Amount, BlockNumber, Call, EventRecord, Timestamp, TokenLedger,
    VoteType, Votes, H256,
};
use dao_governance::{Governor, ProposalState, ProposalVotes};
use dao_runtime::{DaoConfig, EventFilter, Runtime};
use std::path::Path;
use tracing::info;

use crate::accounts::{self, resolve};
use crate::actions::ActionSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TokenKind {
    Dao,
    Tax,
}

impl TokenKind {
    pub fn address(self, runtime: &Runtime) -> Address {
        match self {
            TokenKind::Dao => runtime.world().voting_token.address(),
            TokenKind::Tax => runtime.world().tax_token.address(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Support {
    For,
    Against,
    Abstain,
}

impl From<Support> for VoteType {
    fn from(support: Support) -> Self {
        match support {
            Support::For => VoteType::For,
            Support::Against => VoteType::Against,
            Support::Abstain => VoteType::Abstain,
        }
    }
}

/// Fresh deployment with the well-known deployer account
pub fn init(config: Option<&Path>) -> Result<Runtime> {
    let config = match config {
        Some(path) => DaoConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DaoConfig::default(),
    };
    let runtime = Runtime::genesis(config, accounts::deployer())?;
    info!(block = runtime.block(), "deployment created");
    Ok(runtime)
}

fn send(
    runtime: &mut Runtime,
    from: &str,
    target: Address,
    action: Action,
) -> Result<Vec<EventRecord>> {
    let sender = resolve(runtime.world(), from)?;
    runtime
        .execute(sender, target, &action)
        .with_context(|| format!("{} from {from} reverted", action.name()))
}

pub fn transfer(
    runtime: &mut Runtime,
    from: &str,
    token: TokenKind,
    to: &str,
    amount: Amount,
) -> Result<Vec<EventRecord>> {
    let to = resolve(runtime.world(), to)?;
    let target = token.address(runtime);
    send(runtime, from, target, Action::Transfer { to, amount })
}

pub fn approve(
    runtime: &mut Runtime,
    owner: &str,
    token: TokenKind,
    spender: &str,
    amount: Amount,
) -> Result<Vec<EventRecord>> {
    let spender = resolve(runtime.world(), spender)?;
    let target = token.address(runtime);
    send(runtime, owner, target, Action::Approve { spender, amount })
}

/// Delegates to `to`, or to the delegator itself
pub fn delegate(runtime: &mut Runtime, from: &str, to: Option<&str>) -> Result<Vec<EventRecord>> {
    let delegatee = resolve(runtime.world(), to.unwrap_or(from))?;
    let target = runtime.world().voting_token.address();
    send(runtime, from, target, Action::Delegate { delegatee })
}

/// Accepts a 1-based position in creation order or a hex proposal id
pub fn find_proposal(runtime: &Runtime, reference: &str) -> Result<H256> {
    let governor = &runtime.world().governor;
    if let Ok(position) = reference.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|i| governor.proposals().nth(i))
            .map(|p| p.id)
            .with_context(|| format!("no proposal #{position}"));
    }
    let id: H256 = reference.parse()?;
    if governor.proposal(id).is_none() {
        bail!("unknown proposal {id}");
    }
    Ok(id)
}

pub fn propose(
    runtime: &mut Runtime,
    from: &str,
    description: &str,
    actions: &[ActionSpec],
) -> Result<H256> {
    if actions.is_empty() {
        bail!("a proposal needs at least one action");
    }
    let calls = actions
        .iter()
        .map(|a| a.to_call(runtime.world()))
        .collect::<Result<Vec<Call>>>()?;
    let id = Governor::hash_proposal(&calls, keccak256(description.as_bytes()));
    let governor = runtime.world().governor.address();
    send(
        runtime,
        from,
        governor,
        Action::Propose {
            calls,
            description: description.to_string(),
        },
    )?;
    Ok(id)
}

pub fn vote(
    runtime: &mut Runtime,
    from: &str,
    proposal: &str,
    support: Support,
    reason: Option<String>,
) -> Result<Vec<EventRecord>> {
    let proposal_id = find_proposal(runtime, proposal)?;
    let governor = runtime.world().governor.address();
    send(
        runtime,
        from,
        governor,
        Action::CastVote {
            proposal_id,
            support: support.into(),
            reason,
        },
    )
}

/// Sends a governor action that names a proposal by its calls and
/// description hash
fn lifecycle(
    runtime: &mut Runtime,
    from: &str,
    proposal: &str,
    build: impl FnOnce(Vec<Call>, H256) -> Action,
) -> Result<Vec<EventRecord>> {
    let id = find_proposal(runtime, proposal)?;
    let governor = &runtime.world().governor;
    let p = governor
        .proposal(id)
        .with_context(|| format!("unknown proposal {id}"))?;
    let action = build(p.calls.clone(), p.description_hash);
    let target = governor.address();
    send(runtime, from, target, action)
}

pub fn queue(runtime: &mut Runtime, from: &str, proposal: &str) -> Result<Vec<EventRecord>> {
    lifecycle(runtime, from, proposal, |calls, description_hash| {
        Action::Queue {
            calls,
            description_hash,
        }
    })
}

pub fn execute(runtime: &mut Runtime, from: &str, proposal: &str) -> Result<Vec<EventRecord>> {
    lifecycle(runtime, from, proposal, |calls, description_hash| {
        Action::ExecuteProposal {
            calls,
            description_hash,
        }
    })
}

pub fn cancel(runtime: &mut Runtime, from: &str, proposal: &str) -> Result<Vec<EventRecord>> {
    lifecycle(runtime, from, proposal, |calls, description_hash| {
        Action::CancelProposal {
            calls,
            description_hash,
        }
    })
}

/// Approves the vault and stakes in one transaction
pub fn stake(runtime: &mut Runtime, from: &str, amount: Amount) -> Result<Vec<EventRecord>> {
    let sender = resolve(runtime.world(), from)?;
    let world = runtime.world();
    let vault = world.vault.address();
    let calls = [
        Call::action(
            world.vault.staking_token(),
            &Action::Approve {
                spender: vault,
                amount,
            },
        )?,
        Call::action(vault, &Action::Stake { amount })?,
    ];
    runtime
        .transact_all(sender, &calls)
        .with_context(|| format!("stake from {from} reverted"))
}

pub fn withdraw(runtime: &mut Runtime, from: &str, amount: Amount) -> Result<Vec<EventRecord>> {
    let vault = runtime.world().vault.address();
    send(runtime, from, vault, Action::Withdraw { amount })
}

pub fn claim(runtime: &mut Runtime, from: &str) -> Result<Vec<EventRecord>> {
    let vault = runtime.world().vault.address();
    send(runtime, from, vault, Action::ClaimRewards)
}

pub fn distribute(runtime: &mut Runtime, from: &str) -> Result<Vec<EventRecord>> {
    let splitter = runtime.world().splitter.address();
    send(runtime, from, splitter, Action::Distribute)
}

pub fn events(
    runtime: &Runtime,
    name: Option<&str>,
    emitter: Option<&str>,
    from_block: BlockNumber,
    to_block: Option<BlockNumber>,
) -> Result<Vec<EventRecord>> {
    let mut filter = EventFilter::new().blocks(from_block, to_block);
    if let Some(name) = name {
        filter = filter.name(name);
    }
    if let Some(emitter) = emitter {
        filter = filter.emitter(resolve(runtime.world(), emitter)?);
    }
    Ok(runtime.log().query(&filter).into_iter().cloned().collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSummary {
    pub address: Address,
    pub dao_balance: Amount,
    pub votes: Amount,
    pub delegate: Address,
    pub tax_balance: Amount,
    pub staked: Amount,
    pub earned: Amount,
    pub unlocks_at: Timestamp,
    pub native: Amount,
}

pub fn account(runtime: &Runtime, name: &str) -> Result<AccountSummary> {
    let world = runtime.world();
    let address = resolve(world, name)?;
    Ok(AccountSummary {
        address,
        dao_balance: world.voting_token.balance_of(address),
        votes: world.voting_token.get_votes(address),
        delegate: world.voting_token.delegates(address),
        tax_balance: world.tax_token.balance_of(address),
        staked: world.vault.staked_balance(address),
        earned: world.vault.earned(address)?,
        unlocks_at: world.vault.unlocks_at(address),
        native: world.native_balance(address),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalSummary {
    pub position: usize,
    pub id: H256,
    pub proposer: Address,
    pub description: String,
    pub state: ProposalState,
    pub votes: ProposalVotes,
    pub snapshot: BlockNumber,
    pub deadline: BlockNumber,
    pub eta: Option<Timestamp>,
}

pub fn proposals(runtime: &Runtime) -> Result<Vec<ProposalSummary>> {
    runtime
        .world()
        .governor
        .proposals()
        .enumerate()
        .map(|(i, p)| -> Result<ProposalSummary> {
            Ok(ProposalSummary {
                position: i + 1,
                id: p.id,
                proposer: p.proposer,
                description: p.description.clone(),
                state: runtime.proposal_state(p.id)?,
                votes: p.votes,
                snapshot: p.snapshot,
                deadline: p.deadline,
                eta: p.eta,
            })
        })
        .collect()
}
