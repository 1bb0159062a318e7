//! Delay-gated operation queue
//!
//! Operations are identified by the keccak hash of their calls, predecessor
//! and salt. Execution is split in two so the host can dispatch the calls
//! against other contracts in between: `begin_execute` validates, the host
//! runs every call, then `complete_execute` marks the operation done.

use dao_core::{
    hash_calls, keccak_concat, Address, AuthoritySet, Call, DaoError, Event, ExecContext, Result,
    TimelockRole, Timestamp, H256,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationState {
    /// Never scheduled, or cancelled
    Unset,
    /// Scheduled, delay not yet elapsed
    Waiting,
    /// Scheduled and executable
    Ready,
    /// Executed
    Done,
    /// Ready but never executed within its grace period
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub ready_at: Timestamp,
    /// Executable strictly before this timestamp; open-ended when unset
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
    pub predecessor: H256,
    pub executed: bool,
    pub canceled: bool,
}

impl Operation {
    fn is_pending(&self) -> bool {
        !self.executed && !self.canceled
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timelock {
    address: Address,
    min_delay: u64,
    roles: AuthoritySet,
    operations: BTreeMap<H256, Operation>,
}

impl Timelock {
    /// The timelock always administers itself. `admin` is an optional extra
    /// admin for initial setup, expected to renounce afterwards. Proposers
    /// are also granted the canceller role.
    pub fn new(
        ctx: &mut ExecContext,
        address: Address,
        min_delay: u64,
        proposers: &[Address],
        executors: &[Address],
        admin: Option<Address>,
    ) -> Self {
        let mut timelock = Self {
            address,
            min_delay,
            roles: AuthoritySet::new(),
            operations: BTreeMap::new(),
        };
        timelock.grant(ctx, TimelockRole::Admin, address, address);
        if let Some(admin) = admin {
            timelock.grant(ctx, TimelockRole::Admin, admin, address);
        }
        for proposer in proposers {
            timelock.grant(ctx, TimelockRole::Proposer, *proposer, address);
            timelock.grant(ctx, TimelockRole::Canceller, *proposer, address);
        }
        for executor in executors {
            timelock.grant(ctx, TimelockRole::Executor, *executor, address);
        }
        ctx.emit(
            address,
            Event::MinDelayChange {
                old_delay: 0,
                new_delay: min_delay,
            },
        );
        info!(timelock = %address, min_delay, "timelock deployed");
        timelock
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn min_delay(&self) -> u64 {
        self.min_delay
    }

    pub fn roles(&self) -> &AuthoritySet {
        &self.roles
    }

    pub fn has_role(&self, role: TimelockRole, account: Address) -> bool {
        self.roles.has_role(role, account)
    }

    pub fn hash_operation(call: &Call, predecessor: H256, salt: H256) -> H256 {
        keccak_concat(&[
            b"operation",
            &call.hash_input(),
            predecessor.as_bytes(),
            salt.as_bytes(),
        ])
    }

    pub fn hash_operation_batch(calls: &[Call], predecessor: H256, salt: H256) -> H256 {
        keccak_concat(&[
            b"operation-batch",
            hash_calls(calls).as_bytes(),
            predecessor.as_bytes(),
            salt.as_bytes(),
        ])
    }

    pub fn operation(&self, id: H256) -> Option<&Operation> {
        self.operations.get(&id)
    }

    pub fn operation_state(&self, id: H256, now: Timestamp) -> OperationState {
        match self.operations.get(&id) {
            None => OperationState::Unset,
            Some(op) if op.canceled => OperationState::Unset,
            Some(op) if op.executed => OperationState::Done,
            Some(op) if op.expires_at.is_some_and(|at| now >= at) => OperationState::Expired,
            Some(op) if now >= op.ready_at => OperationState::Ready,
            Some(_) => OperationState::Waiting,
        }
    }

    /// Waiting, ready or expired
    pub fn is_operation_pending(&self, id: H256) -> bool {
        self.operations.get(&id).is_some_and(Operation::is_pending)
    }

    pub fn is_operation_ready(&self, id: H256, now: Timestamp) -> bool {
        self.operation_state(id, now) == OperationState::Ready
    }

    pub fn is_operation_done(&self, id: H256) -> bool {
        self.operations.get(&id).is_some_and(|op| op.executed)
    }

    /// Timestamp at which the operation becomes ready, 0 when unset
    pub fn get_timestamp(&self, id: H256) -> Timestamp {
        match self.operations.get(&id) {
            Some(op) if !op.canceled => op.ready_at,
            _ => 0,
        }
    }

    pub fn schedule(
        &mut self,
        ctx: &mut ExecContext,
        sender: Address,
        call: Call,
        predecessor: H256,
        salt: H256,
        delay: u64,
    ) -> Result<H256> {
        let id = Self::hash_operation(&call, predecessor, salt);
        self.schedule_calls(
            ctx,
            sender,
            id,
            std::slice::from_ref(&call),
            predecessor,
            delay,
            None,
        )?;
        Ok(id)
    }

    pub fn schedule_batch(
        &mut self,
        ctx: &mut ExecContext,
        sender: Address,
        calls: &[Call],
        predecessor: H256,
        salt: H256,
        delay: u64,
    ) -> Result<H256> {
        let id = Self::hash_operation_batch(calls, predecessor, salt);
        self.schedule_calls(ctx, sender, id, calls, predecessor, delay, None)?;
        Ok(id)
    }

    /// Like `schedule_batch`, but the operation can only be executed during
    /// the `grace_period` seconds after it becomes ready
    #[allow(clippy::too_many_arguments)]
    pub fn schedule_batch_expiring(
        &mut self,
        ctx: &mut ExecContext,
        sender: Address,
        calls: &[Call],
        predecessor: H256,
        salt: H256,
        delay: u64,
        grace_period: u64,
    ) -> Result<H256> {
        let id = Self::hash_operation_batch(calls, predecessor, salt);
        self.schedule_calls(ctx, sender, id, calls, predecessor, delay, Some(grace_period))?;
        Ok(id)
    }

    #[allow(clippy::too_many_arguments)]
    fn schedule_calls(
        &mut self,
        ctx: &mut ExecContext,
        sender: Address,
        id: H256,
        calls: &[Call],
        predecessor: H256,
        delay: u64,
        grace_period: Option<u64>,
    ) -> Result<()> {
        self.ensure_role(TimelockRole::Proposer, sender)?;
        if calls.is_empty() {
            return Err(DaoError::InvalidParameter("empty operation".to_string()));
        }
        if delay < self.min_delay {
            return Err(DaoError::InvalidParameter(format!(
                "insufficient delay: {delay} < {}",
                self.min_delay
            )));
        }
        match self.operations.get(&id) {
            Some(op) if op.executed => {
                return Err(DaoError::InvalidState(format!(
                    "operation {id} already executed"
                )));
            }
            Some(op) if !op.canceled => return Err(DaoError::AlreadyScheduled(id)),
            _ => {}
        }
        let ready_at = ctx
            .timestamp()
            .checked_add(delay)
            .ok_or(DaoError::Overflow)?;
        let expires_at = grace_period
            .map(|grace| ready_at.checked_add(grace).ok_or(DaoError::Overflow))
            .transpose()?;
        self.operations.insert(
            id,
            Operation {
                ready_at,
                expires_at,
                predecessor,
                executed: false,
                canceled: false,
            },
        );
        for (index, call) in calls.iter().enumerate() {
            ctx.emit(
                self.address,
                Event::CallScheduled {
                    id,
                    index,
                    call: call.clone(),
                    predecessor,
                    delay,
                },
            );
        }
        info!(timelock = %self.address, %id, calls = calls.len(), ready_at, "operation scheduled");
        Ok(())
    }

    /// Validates that `sender` may execute `id` now. The caller dispatches
    /// the calls and then calls `complete_execute` in the same transaction.
    pub fn begin_execute(&self, ctx: &ExecContext, sender: Address, id: H256) -> Result<()> {
        if !self.roles.has_role_or_open(TimelockRole::Executor, sender) {
            return Err(DaoError::AccessDenied(format!(
                "{sender} lacks role {}",
                TimelockRole::Executor
            )));
        }
        self.ensure_ready(ctx, id)?;
        let predecessor = self
            .operations
            .get(&id)
            .map(|op| op.predecessor)
            .unwrap_or(H256::ZERO);
        if !predecessor.is_zero() && !self.is_operation_done(predecessor) {
            return Err(DaoError::InvalidState(format!(
                "predecessor {predecessor} not executed"
            )));
        }
        Ok(())
    }

    /// Marks `id` executed once every call has run. Fails if the calls
    /// themselves changed the operation (re-entrant execute or cancel).
    pub fn complete_execute(
        &mut self,
        ctx: &mut ExecContext,
        id: H256,
        calls: &[Call],
    ) -> Result<()> {
        self.ensure_ready(ctx, id)?;
        if let Some(op) = self.operations.get_mut(&id) {
            op.executed = true;
        }
        for (index, call) in calls.iter().enumerate() {
            ctx.emit(
                self.address,
                Event::CallExecuted {
                    id,
                    index,
                    call: call.clone(),
                },
            );
        }
        info!(timelock = %self.address, %id, "operation executed");
        Ok(())
    }

    pub fn cancel(&mut self, ctx: &mut ExecContext, sender: Address, id: H256) -> Result<()> {
        self.ensure_role(TimelockRole::Canceller, sender)?;
        match self.operations.get_mut(&id) {
            Some(op) if op.is_pending() => op.canceled = true,
            _ => {
                return Err(DaoError::InvalidState(format!(
                    "operation {id} cannot be cancelled"
                )))
            }
        }
        ctx.emit(self.address, Event::Cancelled { id });
        info!(timelock = %self.address, %id, %sender, "operation cancelled");
        Ok(())
    }

    /// Only reachable through a scheduled operation targeting the timelock
    pub fn update_delay(
        &mut self,
        ctx: &mut ExecContext,
        sender: Address,
        new_delay: u64,
    ) -> Result<()> {
        if sender != self.address {
            return Err(DaoError::AccessDenied(format!(
                "{sender} is not the timelock"
            )));
        }
        let old_delay = std::mem::replace(&mut self.min_delay, new_delay);
        ctx.emit(
            self.address,
            Event::MinDelayChange {
                old_delay,
                new_delay,
            },
        );
        info!(timelock = %self.address, old_delay, new_delay, "min delay changed");
        Ok(())
    }

    pub fn grant_role(
        &mut self,
        ctx: &mut ExecContext,
        sender: Address,
        role: TimelockRole,
        account: Address,
    ) -> Result<()> {
        self.ensure_role(TimelockRole::Admin, sender)?;
        self.grant(ctx, role, account, sender);
        Ok(())
    }

    pub fn revoke_role(
        &mut self,
        ctx: &mut ExecContext,
        sender: Address,
        role: TimelockRole,
        account: Address,
    ) -> Result<()> {
        self.ensure_role(TimelockRole::Admin, sender)?;
        self.revoke(ctx, role, account, sender);
        Ok(())
    }

    /// Drops one of the sender's own roles. Renouncing `Admin` is permanent:
    /// afterwards only the timelock itself can change role membership.
    pub fn renounce_role(
        &mut self,
        ctx: &mut ExecContext,
        sender: Address,
        role: TimelockRole,
        account: Address,
    ) -> Result<()> {
        if account != sender {
            return Err(DaoError::AccessDenied(
                "can only renounce roles for self".to_string(),
            ));
        }
        self.revoke(ctx, role, account, sender);
        Ok(())
    }

    fn grant(
        &mut self,
        ctx: &mut ExecContext,
        role: TimelockRole,
        account: Address,
        sender: Address,
    ) {
        if self.roles.add(role, account) {
            ctx.emit(
                self.address,
                Event::RoleGranted {
                    role,
                    account,
                    sender,
                },
            );
            debug!(timelock = %self.address, %role, %account, "role granted");
        }
    }

    fn revoke(
        &mut self,
        ctx: &mut ExecContext,
        role: TimelockRole,
        account: Address,
        sender: Address,
    ) {
        if self.roles.remove(role, account) {
            ctx.emit(
                self.address,
                Event::RoleRevoked {
                    role,
                    account,
                    sender,
                },
            );
            debug!(timelock = %self.address, %role, %account, "role revoked");
        }
    }

    fn ensure_role(&self, role: TimelockRole, account: Address) -> Result<()> {
        if !self.roles.has_role(role, account) {
            return Err(DaoError::AccessDenied(format!("{account} lacks role {role}")));
        }
        Ok(())
    }

    fn ensure_ready(&self, ctx: &ExecContext, id: H256) -> Result<()> {
        match self.operation_state(id, ctx.timestamp()) {
            OperationState::Ready => Ok(()),
            state => Err(DaoError::InvalidState(format!(
                "operation {id} is not ready ({state:?})"
            ))),
        }
    }
}
