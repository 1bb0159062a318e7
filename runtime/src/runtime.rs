//! Single-threaded host with atomic transactions
//!
//! Each transaction runs against the current block. On any error the world
//! is restored from the snapshot taken before the first call and none of
//! the transaction's events reach the log.

use dao_core::{
    Action, Address, Amount, BlockNumber, Call, DaoError, Env, EventRecord, ExecContext, Result,
    TimelockRole, Timestamp, TokenLedger, H256,
};
use dao_economics::{RevenueSplitter, StakingVault, TaxToken};
use dao_governance::{Governor, GovernorSettings, ProposalState};
use dao_timelock::Timelock;
use dao_token::VotingToken;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::config::{whole_tokens, AllocationToken, DaoConfig};
use crate::dispatch::dispatch;
use crate::log::EventLog;
use crate::world::World;

/// Deployment order; contract addresses derive from `(deployer, nonce)`
mod nonce {
    pub const VOTING_TOKEN: u64 = 0;
    pub const TIMELOCK: u64 = 1;
    pub const GOVERNOR: u64 = 2;
    pub const TAX_TOKEN: u64 = 3;
    pub const VAULT: u64 = 4;
    pub const SPLITTER: u64 = 5;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runtime {
    config: DaoConfig,
    deployer: Address,
    env: Env,
    world: World,
    log: EventLog,
}

impl Runtime {
    /// Deploys and wires every contract from `config`, with `deployer` as
    /// the initial owner and admin. Governance is not yet in control; see
    /// `hand_over_to_governance`.
    pub fn genesis(config: DaoConfig, deployer: Address) -> Result<Self> {
        config
            .validate()
            .map_err(|e| DaoError::InvalidParameter(e.to_string()))?;
        let env = Env::new(1, config.chain.genesis_timestamp, config.chain.chain_id);
        let mut ctx = ExecContext::new(env);
        let at = |n| Address::derive_contract(deployer, n);

        let voting_token = VotingToken::new(
            &mut ctx,
            at(nonce::VOTING_TOKEN),
            config.token.name.clone(),
            config.token.symbol.clone(),
            deployer,
            whole_tokens(config.token.initial_supply),
        )?;
        let timelock = Timelock::new(
            &mut ctx,
            at(nonce::TIMELOCK),
            config.timelock.min_delay,
            &[],
            &[],
            Some(deployer),
        );
        let governor = Governor::new(
            at(nonce::GOVERNOR),
            config.governor.name.clone(),
            voting_token.address(),
            timelock.address(),
            GovernorSettings {
                voting_delay: config.governor.voting_delay,
                voting_period: config.governor.voting_period,
                proposal_threshold: whole_tokens(config.governor.proposal_threshold),
                quorum_bps: config.governor.quorum_bps,
                grace_period: config.governor.grace_period,
            },
        )?;
        let mut tax_token = TaxToken::new(
            &mut ctx,
            at(nonce::TAX_TOKEN),
            config.tax_token.name.clone(),
            config.tax_token.symbol.clone(),
            deployer,
            whole_tokens(config.tax_token.initial_supply),
        )?;
        let mut vault = StakingVault::new(
            &mut ctx,
            at(nonce::VAULT),
            voting_token.address(),
            tax_token.address(),
            deployer,
        );
        let mut splitter = RevenueSplitter::new(
            &mut ctx,
            at(nonce::SPLITTER),
            tax_token.address(),
            vault.address(),
            config.splitter.dev_wallet.unwrap_or(deployer),
            deployer,
        );

        if tax_token.buy_tax() != config.tax_token.buy_tax_bps {
            tax_token.set_buy_tax(&mut ctx, deployer, config.tax_token.buy_tax_bps)?;
        }
        if tax_token.sell_tax() != config.tax_token.sell_tax_bps {
            tax_token.set_sell_tax(&mut ctx, deployer, config.tax_token.sell_tax_bps)?;
        }
        if vault.min_lock_period() != config.vault.min_lock_period {
            vault.set_min_lock_period(&mut ctx, deployer, config.vault.min_lock_period)?;
        }
        let shares = splitter.shares();
        let wanted = (
            config.splitter.staking_share_bps,
            config.splitter.burn_share_bps,
            config.splitter.dev_share_bps,
        );
        if (shares.staking_bps, shares.burn_bps, shares.dev_bps) != wanted {
            splitter.set_shares(&mut ctx, deployer, wanted.0, wanted.1, wanted.2)?;
        }

        // tax flows to the splitter; splitter and vault move tokens freely
        tax_token.set_tax_recipient(&mut ctx, deployer, splitter.address())?;
        for account in [splitter.address(), vault.address()] {
            tax_token.set_tax_exempt(&mut ctx, deployer, account, true)?;
            tax_token.set_limit_exempt(&mut ctx, deployer, account, true)?;
        }

        let mut world = World {
            voting_token,
            tax_token,
            vault,
            splitter,
            timelock,
            governor,
            native: BTreeMap::new(),
        };
        for allocation in &config.allocations {
            let amount = whole_tokens(allocation.amount);
            match allocation.token {
                AllocationToken::Dao => {
                    world
                        .voting_token
                        .transfer(&mut ctx, deployer, allocation.to, amount)?
                }
                AllocationToken::Tax => {
                    world
                        .tax_token
                        .transfer(&mut ctx, deployer, allocation.to, amount)?
                }
            }
        }

        let mut log = EventLog::new();
        log.append(ctx.into_events());
        info!(%deployer, governor = %world.governor.address(), timelock = %world.timelock.address(), "genesis complete");
        Ok(Self {
            config,
            deployer,
            env,
            world,
            log,
        })
    }

    pub fn config(&self) -> &DaoConfig {
        &self.config
    }

    pub fn deployer(&self) -> Address {
        self.deployer
    }

    pub fn env(&self) -> Env {
        self.env
    }

    pub fn block(&self) -> BlockNumber {
        self.env.block
    }

    pub fn timestamp(&self) -> Timestamp {
        self.env.timestamp
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Runs one call atomically and returns the events it committed
    pub fn transact(&mut self, sender: Address, call: Call) -> Result<Vec<EventRecord>> {
        self.transact_all(sender, std::slice::from_ref(&call))
    }

    /// Runs `calls` in order as one atomic transaction
    pub fn transact_all(&mut self, sender: Address, calls: &[Call]) -> Result<Vec<EventRecord>> {
        let snapshot = self.world.clone();
        let mut ctx = ExecContext::new(self.env);
        let result = calls
            .iter()
            .try_for_each(|call| dispatch(&mut self.world, &mut ctx, sender, call));
        match result {
            Ok(()) => {
                let events = ctx.into_events();
                self.log.append(events.iter().cloned());
                Ok(events)
            }
            Err(e) => {
                self.world = snapshot;
                warn!(%sender, block = self.env.block, error = %e, "transaction reverted");
                Err(e)
            }
        }
    }

    /// Encodes `action` and sends it to `target`
    pub fn execute(
        &mut self,
        sender: Address,
        target: Address,
        action: &Action,
    ) -> Result<Vec<EventRecord>> {
        self.transact(sender, Call::action(target, action)?)
    }

    /// Advances `blocks` blocks, each moving the clock by the block time.
    /// The clock is left untouched when either counter would overflow.
    pub fn mine(&mut self, blocks: u64) -> Result<()> {
        let elapsed = blocks
            .checked_mul(self.config.chain.block_time)
            .ok_or(DaoError::Overflow)?;
        let block = self.env.block.checked_add(blocks).ok_or(DaoError::Overflow)?;
        let timestamp = self
            .env
            .timestamp
            .checked_add(elapsed)
            .ok_or(DaoError::Overflow)?;
        self.env.block = block;
        self.env.timestamp = timestamp;
        Ok(())
    }

    /// Moves the clock forward and mines one block
    pub fn increase_time(&mut self, seconds: u64) -> Result<()> {
        let before = self.env;
        self.env.timestamp = self
            .env
            .timestamp
            .checked_add(seconds)
            .ok_or(DaoError::Overflow)?;
        if let Err(e) = self.mine(1) {
            self.env = before;
            return Err(e);
        }
        Ok(())
    }

    /// Host-level native-coin credit, outside any transaction
    pub fn set_native_balance(&mut self, account: Address, amount: Amount) {
        self.world.set_native_balance(account, amount);
    }

    /// Gives the governor control of the timelock and the timelock control
    /// of every configurable contract, then drops the deployer's admin
    /// capability. Runs as one transaction from the deployer.
    pub fn hand_over_to_governance(&mut self) -> Result<Vec<EventRecord>> {
        let world = &self.world;
        let timelock = world.timelock.address();
        let governor = world.governor.address();
        let deployer = self.deployer;
        let calls = [
            Call::action(
                timelock,
                &Action::GrantRole {
                    role: TimelockRole::Proposer,
                    account: governor,
                },
            )?,
            Call::action(
                timelock,
                &Action::GrantRole {
                    role: TimelockRole::Canceller,
                    account: governor,
                },
            )?,
            Call::action(
                timelock,
                &Action::GrantRole {
                    role: TimelockRole::Executor,
                    account: Address::ZERO,
                },
            )?,
            Call::action(
                world.tax_token.address(),
                &Action::SetTaxExempt {
                    account: timelock,
                    exempt: true,
                },
            )?,
            Call::action(
                world.tax_token.address(),
                &Action::SetLimitExempt {
                    account: timelock,
                    exempt: true,
                },
            )?,
            Call::action(
                world.tax_token.address(),
                &Action::TransferOwnership {
                    new_owner: timelock,
                },
            )?,
            Call::action(
                world.splitter.address(),
                &Action::TransferOwnership {
                    new_owner: timelock,
                },
            )?,
            Call::action(
                world.vault.address(),
                &Action::TransferOwnership {
                    new_owner: timelock,
                },
            )?,
            Call::action(
                timelock,
                &Action::RenounceRole {
                    role: TimelockRole::Admin,
                    account: deployer,
                },
            )?,
        ];
        let events = self.transact_all(deployer, &calls)?;
        info!(%governor, %timelock, "governance in control");
        Ok(events)
    }

    /// Governance control is complete once the deployer holds no admin role
    pub fn is_governed(&self) -> bool {
        !self
            .world
            .timelock
            .has_role(TimelockRole::Admin, self.deployer)
    }

    pub fn proposal_state(&self, id: H256) -> Result<ProposalState> {
        self.world.proposal_state(&self.env, id)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| DaoError::Codec(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| DaoError::Codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dao_core::UNIT;

    fn runtime() -> Runtime {
        Runtime::genesis(DaoConfig::default(), Address::from_label("deployer")).unwrap()
    }

    #[test]
    fn test_genesis_wiring() {
        let rt = runtime();
        let w = rt.world();
        let deployer = rt.deployer();
        assert_eq!(w.voting_token.balance_of(deployer), 1_000_000 * UNIT);
        assert_eq!(w.tax_token.tax_recipient(), w.splitter.address());
        assert!(w.tax_token.is_tax_exempt(w.vault.address()));
        assert!(w.tax_token.is_limit_exempt(w.splitter.address()));
        assert_eq!(w.splitter.dev_wallet(), deployer);
        assert_eq!(w.splitter.staking_vault(), w.vault.address());
        assert_eq!(w.vault.staking_token(), w.voting_token.address());
        assert_eq!(w.vault.reward_token(), w.tax_token.address());
        assert_eq!(
            w.governor.address(),
            Address::derive_contract(deployer, nonce::GOVERNOR)
        );
        assert!(!rt.is_governed());
        assert!(!rt.log().is_empty());
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let mut rt = runtime();
        let deployer = rt.deployer();
        let alice = Address::from_label("alice");
        let token = rt.world().voting_token.address();
        let before = rt.world().clone();
        let log_len = rt.log().len();

        let calls = [
            Call::action(token, &Action::Transfer { to: alice, amount: UNIT }).unwrap(),
            Call::action(
                token,
                &Action::Transfer {
                    to: alice,
                    amount: 10_000_000 * UNIT,
                },
            )
            .unwrap(),
        ];
        assert!(matches!(
            rt.transact_all(deployer, &calls),
            Err(DaoError::InsufficientFunds { .. })
        ));
        assert_eq!(rt.world(), &before);
        assert_eq!(rt.log().len(), log_len);
    }

    #[test]
    fn test_clock() {
        let mut rt = runtime();
        let (block, ts) = (rt.block(), rt.timestamp());
        rt.mine(10).unwrap();
        assert_eq!(rt.block(), block + 10);
        assert_eq!(rt.timestamp(), ts + 30);
        rt.increase_time(3_600).unwrap();
        assert_eq!(rt.block(), block + 11);
        assert_eq!(rt.timestamp(), ts + 30 + 3_600 + 3);
    }

    #[test]
    fn test_clock_overflow_is_rejected() {
        let mut rt = runtime();
        let env = rt.env();
        assert_eq!(rt.mine(u64::MAX), Err(DaoError::Overflow));
        assert_eq!(rt.mine(u64::MAX / 3 + 1), Err(DaoError::Overflow));
        assert_eq!(rt.increase_time(u64::MAX), Err(DaoError::Overflow));
        assert_eq!(rt.env(), env);

        // the timestamp fits but the extra block time does not
        let headroom = u64::MAX - rt.timestamp();
        assert_eq!(rt.increase_time(headroom), Err(DaoError::Overflow));
        assert_eq!(rt.env(), env);
        rt.mine(1).unwrap();
        assert_eq!(rt.block(), env.block + 1);
    }

    #[test]
    fn test_unknown_target_and_plain_value() {
        let mut rt = runtime();
        let deployer = rt.deployer();
        let stranger = Address::from_label("stranger");
        rt.set_native_balance(deployer, 10);
        rt.transact(deployer, Call::transfer_value(stranger, 4)).unwrap();
        assert_eq!(rt.world().native_balance(stranger), 4);

        let call = Call::action(stranger, &Action::Distribute).unwrap();
        assert_eq!(
            rt.transact(deployer, call),
            Err(DaoError::UnknownTarget(stranger))
        );
    }

    #[test]
    fn test_json_round_trip() {
        let mut rt = runtime();
        rt.hand_over_to_governance().unwrap();
        let restored = Runtime::from_json(&rt.to_json().unwrap()).unwrap();
        assert_eq!(restored, rt);
    }
}
