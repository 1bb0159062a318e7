//! Governor: proposal lifecycle over the voting ledger and the timelock
//!
//! The governor never stores a proposal's state. `state` derives it from
//! the stored flags, the current block and time, and the linked timelock
//! operation. Execution only validates and flags the proposal; the host
//! then runs the timelocked batch on the governor's behalf.

use dao_core::{
    apply_bps, hash_calls, keccak256, keccak_concat, Address, Amount, BlockNumber, Call, DaoError,
    Env, Event, ExecContext, Result, Timestamp, VoteType, Votes, BPS_DENOMINATOR, H256,
};
use dao_timelock::Timelock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config;
use crate::proposal::{Proposal, ProposalState, ProposalVotes, Receipt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernorSettings {
    /// Blocks between proposal creation and the voting snapshot
    pub voting_delay: u64,
    /// Blocks during which votes are accepted
    pub voting_period: u64,
    pub proposal_threshold: Amount,
    /// Share of the snapshot total supply needed as For + Abstain
    pub quorum_bps: u16,
    /// Seconds a queued proposal stays executable after its eta
    pub grace_period: u64,
}

impl Default for GovernorSettings {
    fn default() -> Self {
        Self {
            voting_delay: config::DEFAULT_VOTING_DELAY,
            voting_period: config::DEFAULT_VOTING_PERIOD,
            proposal_threshold: 0,
            quorum_bps: config::DEFAULT_QUORUM_BPS,
            grace_period: config::GRACE_PERIOD,
        }
    }
}

/// What the host needs to run a proposal's batch through the timelock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub proposal_id: H256,
    pub predecessor: H256,
    pub salt: H256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Governor {
    address: Address,
    name: String,
    token: Address,
    timelock: Address,
    settings: GovernorSettings,
    guardian: Address,
    proposals: BTreeMap<H256, Proposal>,
    /// Proposal ids in creation order
    proposal_ids: Vec<H256>,
}

impl Governor {
    pub fn new(
        address: Address,
        name: impl Into<String>,
        token: Address,
        timelock: Address,
        settings: GovernorSettings,
    ) -> Result<Self> {
        validate_settings(&settings)?;
        let name = name.into();
        info!(governor = %address, %token, %timelock, name = %name, "governor deployed");
        Ok(Self {
            address,
            name,
            token,
            timelock,
            settings,
            guardian: Address::ZERO,
            proposals: BTreeMap::new(),
            proposal_ids: Vec::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn timelock(&self) -> Address {
        self.timelock
    }

    pub fn settings(&self) -> &GovernorSettings {
        &self.settings
    }

    pub fn voting_delay(&self) -> u64 {
        self.settings.voting_delay
    }

    pub fn voting_period(&self) -> u64 {
        self.settings.voting_period
    }

    pub fn proposal_threshold(&self) -> Amount {
        self.settings.proposal_threshold
    }

    pub fn quorum_bps(&self) -> u16 {
        self.settings.quorum_bps
    }

    pub fn guardian(&self) -> Address {
        self.guardian
    }

    /// Deterministic id over the call bundle and the description hash
    pub fn hash_proposal(calls: &[Call], description_hash: H256) -> H256 {
        keccak_concat(&[
            b"proposal",
            hash_calls(calls).as_bytes(),
            description_hash.as_bytes(),
        ])
    }

    /// Salt under which a proposal's batch is scheduled in the timelock
    pub fn timelock_salt(&self, description_hash: H256) -> H256 {
        description_hash.xor_address(self.address)
    }

    /// Votes required at `block`
    pub fn quorum<V: Votes>(&self, env: &Env, token: &V, block: BlockNumber) -> Result<Amount> {
        let supply = token.get_past_total_supply(env, block)?;
        apply_bps(supply, self.settings.quorum_bps)
    }

    pub fn proposal(&self, id: H256) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    /// Proposals in creation order
    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposal_ids
            .iter()
            .filter_map(|id| self.proposals.get(id))
    }

    pub fn proposal_count(&self) -> usize {
        self.proposal_ids.len()
    }

    pub fn proposal_snapshot(&self, id: H256) -> Result<BlockNumber> {
        Ok(self.get(id)?.snapshot)
    }

    pub fn proposal_deadline(&self, id: H256) -> Result<BlockNumber> {
        Ok(self.get(id)?.deadline)
    }

    pub fn proposal_proposer(&self, id: H256) -> Result<Address> {
        Ok(self.get(id)?.proposer)
    }

    /// Timestamp at which the queued batch becomes executable, 0 if not queued
    pub fn proposal_eta(&self, id: H256) -> Result<Timestamp> {
        Ok(self.get(id)?.eta.unwrap_or(0))
    }

    pub fn proposal_votes(&self, id: H256) -> Result<ProposalVotes> {
        Ok(self.get(id)?.votes)
    }

    pub fn has_voted(&self, id: H256, account: Address) -> bool {
        self.proposals
            .get(&id)
            .is_some_and(|p| p.has_voted(account))
    }

    pub fn receipt(&self, id: H256, account: Address) -> Option<&Receipt> {
        self.proposals.get(&id)?.receipts.get(&account)
    }

    pub fn state<V: Votes>(
        &self,
        env: &Env,
        token: &V,
        timelock: &Timelock,
        id: H256,
    ) -> Result<ProposalState> {
        let proposal = self.get(id)?;
        if proposal.executed {
            return Ok(ProposalState::Executed);
        }
        if proposal.canceled {
            return Ok(ProposalState::Canceled);
        }
        if env.block <= proposal.snapshot {
            return Ok(ProposalState::Pending);
        }
        if env.block <= proposal.deadline {
            return Ok(ProposalState::Active);
        }
        let quorum = self.quorum(env, token, proposal.snapshot)?;
        let votes = &proposal.votes;
        if votes.for_votes <= votes.against || votes.quorum_votes() < quorum {
            return Ok(ProposalState::Defeated);
        }
        let (Some(eta), Some(op)) = (proposal.eta, proposal.timelock_id) else {
            return Ok(ProposalState::Succeeded);
        };
        if timelock.is_operation_done(op) {
            return Ok(ProposalState::Executed);
        }
        if !timelock.is_operation_pending(op) {
            // operation cancelled directly on the timelock
            return Ok(ProposalState::Canceled);
        }
        if env.timestamp >= eta.saturating_add(self.settings.grace_period) {
            return Ok(ProposalState::Expired);
        }
        Ok(ProposalState::Queued)
    }

    /// Creates a proposal. The proposer's current voting power must meet
    /// the threshold.
    pub fn propose<V: Votes>(
        &mut self,
        ctx: &mut ExecContext,
        token: &V,
        proposer: Address,
        calls: Vec<Call>,
        description: String,
    ) -> Result<H256> {
        if calls.is_empty() {
            return Err(DaoError::InvalidParameter("empty proposal".to_string()));
        }
        let votes = token.get_votes(proposer);
        if votes < self.settings.proposal_threshold {
            return Err(DaoError::AccessDenied(format!(
                "proposer votes {votes} below threshold {}",
                self.settings.proposal_threshold
            )));
        }
        let description_hash = keccak256(description.as_bytes());
        let id = Self::hash_proposal(&calls, description_hash);
        if self.proposals.contains_key(&id) {
            return Err(DaoError::InvalidState(format!("proposal {id} already exists")));
        }
        let snapshot = ctx
            .block()
            .checked_add(self.settings.voting_delay)
            .ok_or(DaoError::Overflow)?;
        let deadline = snapshot
            .checked_add(self.settings.voting_period)
            .ok_or(DaoError::Overflow)?;

        ctx.emit(
            self.address,
            Event::ProposalCreated {
                proposal_id: id,
                proposer,
                calls: calls.clone(),
                description: description.clone(),
                vote_start: snapshot,
                vote_end: deadline,
            },
        );
        info!(governor = %self.address, %id, %proposer, snapshot, deadline, "proposal created");
        self.proposals.insert(
            id,
            Proposal {
                id,
                proposer,
                calls,
                description,
                description_hash,
                snapshot,
                deadline,
                votes: ProposalVotes::default(),
                receipts: BTreeMap::new(),
                canceled: false,
                executed: false,
                eta: None,
                timelock_id: None,
            },
        );
        self.proposal_ids.push(id);
        Ok(id)
    }

    /// Records a vote weighted by the voter's power at the snapshot block
    #[allow(clippy::too_many_arguments)]
    pub fn cast_vote<V: Votes>(
        &mut self,
        ctx: &mut ExecContext,
        token: &V,
        timelock: &Timelock,
        voter: Address,
        id: H256,
        support: VoteType,
        reason: Option<String>,
    ) -> Result<Amount> {
        let state = self.state(&ctx.env, token, timelock, id)?;
        if state != ProposalState::Active {
            return Err(DaoError::InvalidState(format!(
                "proposal {id} is {state}, not Active"
            )));
        }
        let snapshot = self.get(id)?.snapshot;
        let weight = token.get_past_votes(&ctx.env, voter, snapshot)?;
        let proposal = self.get_mut(id)?;
        if proposal.has_voted(voter) {
            return Err(DaoError::AlreadyVoted {
                proposal: id,
                voter,
            });
        }
        proposal.votes.add(support, weight)?;
        proposal.receipts.insert(voter, Receipt { support, weight });

        ctx.emit(
            self.address,
            Event::VoteCast {
                voter,
                proposal_id: id,
                support,
                weight,
                reason: reason.unwrap_or_default(),
            },
        );
        debug!(governor = %self.address, %id, %voter, %support, weight, "vote cast");
        Ok(weight)
    }

    /// Schedules a succeeded proposal's batch in the timelock. The
    /// operation expires with the proposal, so the batch cannot run
    /// through the timelock directly once the grace period has passed.
    pub fn queue<V: Votes>(
        &mut self,
        ctx: &mut ExecContext,
        token: &V,
        timelock: &mut Timelock,
        calls: &[Call],
        description_hash: H256,
    ) -> Result<H256> {
        let id = Self::hash_proposal(calls, description_hash);
        self.ensure_state(&ctx.env, token, timelock, id, &[ProposalState::Succeeded])?;

        let salt = self.timelock_salt(description_hash);
        let delay = timelock.min_delay();
        let op = timelock.schedule_batch_expiring(
            ctx,
            self.address,
            calls,
            H256::ZERO,
            salt,
            delay,
            self.settings.grace_period,
        )?;
        let eta = ctx
            .timestamp()
            .checked_add(delay)
            .ok_or(DaoError::Overflow)?;

        let proposal = self.get_mut(id)?;
        proposal.eta = Some(eta);
        proposal.timelock_id = Some(op);
        ctx.emit(
            self.address,
            Event::ProposalQueued {
                proposal_id: id,
                eta,
            },
        );
        info!(governor = %self.address, %id, eta, "proposal queued");
        Ok(id)
    }

    /// Flags a queued proposal executed and returns the timelock batch
    /// coordinates. The caller must then execute the batch through the
    /// timelock in the same transaction; a not-yet-ready operation fails
    /// there and rolls this back.
    pub fn execute<V: Votes>(
        &mut self,
        ctx: &mut ExecContext,
        token: &V,
        timelock: &Timelock,
        calls: &[Call],
        description_hash: H256,
    ) -> Result<ExecutionPlan> {
        let id = Self::hash_proposal(calls, description_hash);
        self.ensure_state(&ctx.env, token, timelock, id, &[ProposalState::Queued])?;
        self.get_mut(id)?.executed = true;
        ctx.emit(self.address, Event::ProposalExecuted { proposal_id: id });
        info!(governor = %self.address, %id, "proposal executed");
        Ok(ExecutionPlan {
            proposal_id: id,
            predecessor: H256::ZERO,
            salt: self.timelock_salt(description_hash),
        })
    }

    /// The proposer may cancel while the proposal is pending or active.
    /// The guardian may cancel any proposal that is not final, including
    /// queued ones, whose timelock operation is cancelled with it.
    pub fn cancel<V: Votes>(
        &mut self,
        ctx: &mut ExecContext,
        token: &V,
        timelock: &mut Timelock,
        sender: Address,
        calls: &[Call],
        description_hash: H256,
    ) -> Result<H256> {
        let id = Self::hash_proposal(calls, description_hash);
        let state = self.state(&ctx.env, token, timelock, id)?;
        let proposal = self.get(id)?;
        let is_guardian = !self.guardian.is_zero() && sender == self.guardian;
        if is_guardian {
            if state.is_final() {
                return Err(DaoError::InvalidState(format!(
                    "proposal {id} is {state} and cannot be cancelled"
                )));
            }
        } else if sender == proposal.proposer {
            if !matches!(state, ProposalState::Pending | ProposalState::Active) {
                return Err(DaoError::InvalidState(format!(
                    "proposal {id} is {state}; proposer may only cancel before voting ends"
                )));
            }
        } else {
            return Err(DaoError::AccessDenied(format!(
                "{sender} may not cancel proposal {id}"
            )));
        }

        if let Some(op) = proposal.timelock_id {
            if timelock.is_operation_pending(op) {
                timelock.cancel(ctx, self.address, op)?;
            }
        }
        self.get_mut(id)?.canceled = true;
        ctx.emit(self.address, Event::ProposalCanceled { proposal_id: id });
        info!(governor = %self.address, %id, %sender, "proposal canceled");
        Ok(id)
    }

    pub fn set_voting_delay(
        &mut self,
        ctx: &mut ExecContext,
        sender: Address,
        blocks: u64,
    ) -> Result<()> {
        self.ensure_governance(sender)?;
        let old_delay = std::mem::replace(&mut self.settings.voting_delay, blocks);
        ctx.emit(
            self.address,
            Event::VotingDelaySet {
                old_delay,
                new_delay: blocks,
            },
        );
        info!(governor = %self.address, old_delay, new_delay = blocks, "voting delay updated");
        Ok(())
    }

    pub fn set_voting_period(
        &mut self,
        ctx: &mut ExecContext,
        sender: Address,
        blocks: u64,
    ) -> Result<()> {
        self.ensure_governance(sender)?;
        if blocks == 0 {
            return Err(DaoError::InvalidParameter(
                "voting period must be positive".to_string(),
            ));
        }
        let old_period = std::mem::replace(&mut self.settings.voting_period, blocks);
        ctx.emit(
            self.address,
            Event::VotingPeriodSet {
                old_period,
                new_period: blocks,
            },
        );
        info!(governor = %self.address, old_period, new_period = blocks, "voting period updated");
        Ok(())
    }

    pub fn set_proposal_threshold(
        &mut self,
        ctx: &mut ExecContext,
        sender: Address,
        amount: Amount,
    ) -> Result<()> {
        self.ensure_governance(sender)?;
        let old_threshold = std::mem::replace(&mut self.settings.proposal_threshold, amount);
        ctx.emit(
            self.address,
            Event::ProposalThresholdSet {
                old_threshold,
                new_threshold: amount,
            },
        );
        info!(
            governor = %self.address,
            old_threshold,
            new_threshold = amount,
            "proposal threshold updated"
        );
        Ok(())
    }

    pub fn set_quorum_bps(&mut self, ctx: &mut ExecContext, sender: Address, bps: u16) -> Result<()> {
        self.ensure_governance(sender)?;
        if bps > BPS_DENOMINATOR {
            return Err(DaoError::InvalidParameter(format!(
                "quorum {bps} bps exceeds {BPS_DENOMINATOR}"
            )));
        }
        let old_bps = std::mem::replace(&mut self.settings.quorum_bps, bps);
        ctx.emit(
            self.address,
            Event::QuorumUpdated {
                old_bps,
                new_bps: bps,
            },
        );
        info!(governor = %self.address, old_bps, new_bps = bps, "quorum updated");
        Ok(())
    }

    /// Zero disables the guardian
    pub fn set_guardian(
        &mut self,
        ctx: &mut ExecContext,
        sender: Address,
        guardian: Address,
    ) -> Result<()> {
        self.ensure_governance(sender)?;
        self.guardian = guardian;
        ctx.emit(self.address, Event::GuardianUpdated { guardian });
        info!(governor = %self.address, %guardian, "guardian updated");
        Ok(())
    }

    fn ensure_governance(&self, sender: Address) -> Result<()> {
        if sender != self.timelock {
            return Err(DaoError::AccessDenied(format!(
                "{sender} is not the governance executor"
            )));
        }
        Ok(())
    }

    fn ensure_state<V: Votes>(
        &self,
        env: &Env,
        token: &V,
        timelock: &Timelock,
        id: H256,
        allowed: &[ProposalState],
    ) -> Result<()> {
        let state = self.state(env, token, timelock, id)?;
        if !allowed.contains(&state) {
            return Err(DaoError::InvalidState(format!(
                "proposal {id} is {state}, expected one of {allowed:?}"
            )));
        }
        Ok(())
    }

    fn get(&self, id: H256) -> Result<&Proposal> {
        self.proposals
            .get(&id)
            .ok_or_else(|| DaoError::InvalidParameter(format!("unknown proposal {id}")))
    }

    fn get_mut(&mut self, id: H256) -> Result<&mut Proposal> {
        self.proposals
            .get_mut(&id)
            .ok_or_else(|| DaoError::InvalidParameter(format!("unknown proposal {id}")))
    }
}

fn validate_settings(settings: &GovernorSettings) -> Result<()> {
    if settings.voting_period == 0 {
        return Err(DaoError::InvalidParameter(
            "voting period must be positive".to_string(),
        ));
    }
    if settings.quorum_bps > BPS_DENOMINATOR {
        return Err(DaoError::InvalidParameter(format!(
            "quorum {} bps exceeds {BPS_DENOMINATOR}",
            settings.quorum_bps
        )));
    }
    Ok(())
}
