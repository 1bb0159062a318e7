//! Routes a call to the contract at its target address
//!
//! Native value moves before the call body runs. A call with empty data is
//! a plain value transfer and succeeds against any address. Contract calls
//! nest through `dispatch` so the depth limit covers timelock and governor
//! execution.

use dao_core::{Action, Address, Call, DaoError, ExecContext, Result, TokenLedger, H256};
use dao_timelock::Timelock;
use tracing::debug;

use crate::world::{ledger_mut, World};

pub fn dispatch(
    world: &mut World,
    ctx: &mut ExecContext,
    sender: Address,
    call: &Call,
) -> Result<()> {
    ctx.enter_call()?;
    let result = dispatch_call(world, ctx, sender, call);
    ctx.exit_call();
    result
}

fn dispatch_call(
    world: &mut World,
    ctx: &mut ExecContext,
    sender: Address,
    call: &Call,
) -> Result<()> {
    world.move_native(sender, call.target, call.value)?;
    if call.data.is_empty() {
        return Ok(());
    }
    let target = call.target;
    if !world.is_contract(target) {
        return Err(DaoError::UnknownTarget(target));
    }
    let action = Action::decode(&call.data)?;
    debug!(%sender, %target, action = action.name(), value = call.value, "dispatch");

    if target == world.voting_token.address() {
        voting_token(world, ctx, sender, action)
    } else if target == world.tax_token.address() {
        tax_token(world, ctx, sender, action)
    } else if target == world.vault.address() {
        vault(world, ctx, sender, action)
    } else if target == world.splitter.address() {
        splitter(world, ctx, sender, action)
    } else if target == world.timelock.address() {
        timelock(world, ctx, sender, action)
    } else {
        governor(world, ctx, sender, action)
    }
}

fn unsupported(target: Address, action: &Action) -> DaoError {
    DaoError::InvalidParameter(format!("{target} has no entry point {}", action.name()))
}

fn voting_token(
    world: &mut World,
    ctx: &mut ExecContext,
    sender: Address,
    action: Action,
) -> Result<()> {
    let token = &mut world.voting_token;
    match action {
        Action::Transfer { to, amount } => token.transfer(ctx, sender, to, amount),
        Action::Approve { spender, amount } => token.approve(ctx, sender, spender, amount),
        Action::TransferFrom { from, to, amount } => {
            token.transfer_from(ctx, sender, from, to, amount)
        }
        Action::Delegate { delegatee } => token.delegate(ctx, sender, delegatee),
        Action::Permit {
            owner,
            spender,
            value,
            deadline,
            public_key,
            signature,
        } => token.permit(ctx, owner, spender, value, deadline, &public_key, &signature),
        other => Err(unsupported(token.address(), &other)),
    }
}

fn tax_token(
    world: &mut World,
    ctx: &mut ExecContext,
    sender: Address,
    action: Action,
) -> Result<()> {
    let token = &mut world.tax_token;
    match action {
        Action::Transfer { to, amount } => token.transfer(ctx, sender, to, amount),
        Action::Approve { spender, amount } => token.approve(ctx, sender, spender, amount),
        Action::TransferFrom { from, to, amount } => {
            token.transfer_from(ctx, sender, from, to, amount)
        }
        Action::SetBuyTax { bps } => token.set_buy_tax(ctx, sender, bps),
        Action::SetSellTax { bps } => token.set_sell_tax(ctx, sender, bps),
        Action::SetMaxTransactionAmount { amount } => {
            token.set_max_transaction_amount(ctx, sender, amount)
        }
        Action::SetMaxWalletAmount { amount } => token.set_max_wallet_amount(ctx, sender, amount),
        Action::SetTaxRecipient { recipient } => token.set_tax_recipient(ctx, sender, recipient),
        Action::SetTradingEnabled { enabled } => token.set_trading_enabled(ctx, sender, enabled),
        Action::SetAmmPair { pair, is_pair } => token.set_amm_pair(ctx, sender, pair, is_pair),
        Action::SetTaxExempt { account, exempt } => {
            token.set_tax_exempt(ctx, sender, account, exempt)
        }
        Action::SetLimitExempt { account, exempt } => {
            token.set_limit_exempt(ctx, sender, account, exempt)
        }
        Action::TransferOwnership { new_owner } => {
            token.transfer_ownership(ctx, sender, new_owner)
        }
        Action::RenounceOwnership => token.renounce_ownership(ctx, sender),
        other => Err(unsupported(token.address(), &other)),
    }
}

fn vault(world: &mut World, ctx: &mut ExecContext, sender: Address, action: Action) -> Result<()> {
    let World {
        voting_token,
        tax_token,
        vault,
        ..
    } = world;
    match action {
        Action::Stake { amount } => {
            let staking = ledger_mut(voting_token, tax_token, vault.staking_token())?;
            vault.stake(ctx, staking, sender, amount)
        }
        Action::Withdraw { amount } => {
            let staking = ledger_mut(voting_token, tax_token, vault.staking_token())?;
            vault.withdraw(ctx, staking, sender, amount)
        }
        Action::ClaimRewards => {
            let rewards = ledger_mut(voting_token, tax_token, vault.reward_token())?;
            vault.claim_rewards(ctx, rewards, sender).map(|_| ())
        }
        Action::AddRewards { amount } => {
            let rewards = ledger_mut(voting_token, tax_token, vault.reward_token())?;
            vault.add_rewards(ctx, rewards, sender, amount)
        }
        Action::SetMinLockPeriod { period } => vault.set_min_lock_period(ctx, sender, period),
        Action::TransferOwnership { new_owner } => {
            vault.transfer_ownership(ctx, sender, new_owner)
        }
        Action::RenounceOwnership => vault.renounce_ownership(ctx, sender),
        other => Err(unsupported(vault.address(), &other)),
    }
}

fn splitter(
    world: &mut World,
    ctx: &mut ExecContext,
    sender: Address,
    action: Action,
) -> Result<()> {
    let World {
        voting_token,
        tax_token,
        vault,
        splitter,
        ..
    } = world;
    match action {
        Action::Distribute => {
            let token = ledger_mut(voting_token, tax_token, splitter.token())?;
            let vault = (vault.address() == splitter.staking_vault()).then_some(vault);
            splitter.distribute(ctx, token, vault).map(|_| ())
        }
        Action::SetShares {
            staking_bps,
            burn_bps,
            dev_bps,
        } => splitter.set_shares(ctx, sender, staking_bps, burn_bps, dev_bps),
        Action::SetDevWallet { wallet } => splitter.set_dev_wallet(ctx, sender, wallet),
        Action::SetStakingVault { vault } => splitter.set_staking_vault(ctx, sender, vault),
        Action::TransferOwnership { new_owner } => {
            splitter.transfer_ownership(ctx, sender, new_owner)
        }
        Action::RenounceOwnership => splitter.renounce_ownership(ctx, sender),
        other => Err(unsupported(splitter.address(), &other)),
    }
}

fn timelock(
    world: &mut World,
    ctx: &mut ExecContext,
    sender: Address,
    action: Action,
) -> Result<()> {
    match action {
        Action::Schedule {
            call,
            predecessor,
            salt,
            delay,
        } => world
            .timelock
            .schedule(ctx, sender, call, predecessor, salt, delay)
            .map(|_| ()),
        Action::ScheduleBatch {
            calls,
            predecessor,
            salt,
            delay,
        } => world
            .timelock
            .schedule_batch(ctx, sender, &calls, predecessor, salt, delay)
            .map(|_| ()),
        Action::Execute {
            call,
            predecessor,
            salt,
        } => {
            let id = Timelock::hash_operation(&call, predecessor, salt);
            run_operation(world, ctx, sender, id, std::slice::from_ref(&call))
        }
        Action::ExecuteBatch {
            calls,
            predecessor,
            salt,
        } => {
            let id = Timelock::hash_operation_batch(&calls, predecessor, salt);
            run_operation(world, ctx, sender, id, &calls)
        }
        Action::Cancel { id } => world.timelock.cancel(ctx, sender, id),
        Action::UpdateDelay { delay } => world.timelock.update_delay(ctx, sender, delay),
        Action::GrantRole { role, account } => {
            world.timelock.grant_role(ctx, sender, role, account)
        }
        Action::RevokeRole { role, account } => {
            world.timelock.revoke_role(ctx, sender, role, account)
        }
        Action::RenounceRole { role, account } => {
            world.timelock.renounce_role(ctx, sender, role, account)
        }
        other => Err(unsupported(world.timelock.address(), &other)),
    }
}

/// Runs every call of a ready operation with the timelock as sender. Any
/// failing call fails the whole operation.
fn run_operation(
    world: &mut World,
    ctx: &mut ExecContext,
    sender: Address,
    id: H256,
    calls: &[Call],
) -> Result<()> {
    world.timelock.begin_execute(ctx, sender, id)?;
    let timelock = world.timelock.address();
    for call in calls {
        dispatch(world, ctx, timelock, call)?;
    }
    world.timelock.complete_execute(ctx, id, calls)
}

fn governor(
    world: &mut World,
    ctx: &mut ExecContext,
    sender: Address,
    action: Action,
) -> Result<()> {
    let World {
        voting_token,
        timelock,
        governor,
        ..
    } = world;
    match action {
        Action::Propose { calls, description } => governor
            .propose(ctx, voting_token, sender, calls, description)
            .map(|_| ()),
        Action::CastVote {
            proposal_id,
            support,
            reason,
        } => governor
            .cast_vote(ctx, voting_token, timelock, sender, proposal_id, support, reason)
            .map(|_| ()),
        Action::Queue {
            calls,
            description_hash,
        } => governor
            .queue(ctx, voting_token, timelock, &calls, description_hash)
            .map(|_| ()),
        Action::ExecuteProposal {
            calls,
            description_hash,
        } => {
            let plan = governor.execute(ctx, voting_token, timelock, &calls, description_hash)?;
            let batch = Call::action(
                timelock.address(),
                &Action::ExecuteBatch {
                    calls,
                    predecessor: plan.predecessor,
                    salt: plan.salt,
                },
            )?;
            let governor = governor.address();
            dispatch(world, ctx, governor, &batch)
        }
        Action::CancelProposal {
            calls,
            description_hash,
        } => governor
            .cancel(ctx, voting_token, timelock, sender, &calls, description_hash)
            .map(|_| ()),
        Action::SetVotingDelay { blocks } => governor.set_voting_delay(ctx, sender, blocks),
        Action::SetVotingPeriod { blocks } => governor.set_voting_period(ctx, sender, blocks),
        Action::SetProposalThreshold { amount } => {
            governor.set_proposal_threshold(ctx, sender, amount)
        }
        Action::SetQuorumBps { bps } => governor.set_quorum_bps(ctx, sender, bps),
        Action::SetGuardian { guardian } => governor.set_guardian(ctx, sender, guardian),
        other => Err(unsupported(governor.address(), &other)),
    }
}
