//! Calldata: the typed entry points of every contract
//!
//! A `Call` carries opaque bytes so proposals and timelock operations can hash
//! and store them verbatim. The bytes are the bincode encoding of an `Action`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::access::TimelockRole;
use crate::error::{DaoError, Result};
use crate::types::{keccak_concat, amount_word, Address, Amount, H256};

/// One outbound call: target contract, native value and encoded `Action`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub target: Address,
    pub value: Amount,
    pub data: Vec<u8>,
}

impl Call {
    pub fn new(target: Address, value: Amount, data: Vec<u8>) -> Self {
        Self {
            target,
            value,
            data,
        }
    }

    /// Zero-value call carrying an encoded action
    pub fn action(target: Address, action: &Action) -> Result<Self> {
        Ok(Self::new(target, 0, action.encode()?))
    }

    /// Plain native-value transfer with no calldata
    pub fn transfer_value(target: Address, value: Amount) -> Self {
        Self::new(target, value, Vec::new())
    }

    /// Canonical byte encoding used when hashing calls into ids
    pub fn hash_input(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(20 + 32 + 8 + self.data.len());
        out.extend_from_slice(self.target.as_bytes());
        out.extend_from_slice(&amount_word(self.value));
        out.extend_from_slice(&(self.data.len() as u64).to_be_bytes());
        out.extend_from_slice(&self.data);
        out
    }
}

/// Keccak digest over a sequence of calls, in order
pub fn hash_calls(calls: &[Call]) -> H256 {
    let encoded: Vec<Vec<u8>> = calls.iter().map(Call::hash_input).collect();
    let parts: Vec<&[u8]> = encoded.iter().map(Vec::as_slice).collect();
    keccak_concat(&parts)
}

/// Ballot options, numbered as on the wire (Against=0, For=1, Abstain=2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteType {
    Against,
    For,
    Abstain,
}

impl VoteType {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(VoteType::Against),
            1 => Ok(VoteType::For),
            2 => Ok(VoteType::Abstain),
            other => Err(DaoError::InvalidParameter(format!(
                "invalid vote type {other}"
            ))),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            VoteType::Against => 0,
            VoteType::For => 1,
            VoteType::Abstain => 2,
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VoteType::Against => "against",
            VoteType::For => "for",
            VoteType::Abstain => "abstain",
        };
        f.write_str(s)
    }
}

/// Every externally callable entry point, across all contracts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    // Both ledgers
    Transfer {
        to: Address,
        amount: Amount,
    },
    Approve {
        spender: Address,
        amount: Amount,
    },
    TransferFrom {
        from: Address,
        to: Address,
        amount: Amount,
    },

    // Voting ledger
    Delegate {
        delegatee: Address,
    },
    Permit {
        owner: Address,
        spender: Address,
        value: Amount,
        deadline: u64,
        public_key: Vec<u8>,
        signature: Vec<u8>,
    },

    // Ownable contracts
    TransferOwnership {
        new_owner: Address,
    },
    RenounceOwnership,

    // Tax engine
    SetBuyTax {
        bps: u16,
    },
    SetSellTax {
        bps: u16,
    },
    SetMaxTransactionAmount {
        amount: Amount,
    },
    SetMaxWalletAmount {
        amount: Amount,
    },
    SetTaxRecipient {
        recipient: Address,
    },
    SetTradingEnabled {
        enabled: bool,
    },
    SetAmmPair {
        pair: Address,
        is_pair: bool,
    },
    SetTaxExempt {
        account: Address,
        exempt: bool,
    },
    SetLimitExempt {
        account: Address,
        exempt: bool,
    },

    // Staking vault
    Stake {
        amount: Amount,
    },
    Withdraw {
        amount: Amount,
    },
    ClaimRewards,
    AddRewards {
        amount: Amount,
    },
    SetMinLockPeriod {
        period: u64,
    },

    // Revenue splitter
    Distribute,
    SetShares {
        staking_bps: u16,
        burn_bps: u16,
        dev_bps: u16,
    },
    SetDevWallet {
        wallet: Address,
    },
    SetStakingVault {
        vault: Address,
    },

    // Timelock
    Schedule {
        call: Call,
        predecessor: H256,
        salt: H256,
        delay: u64,
    },
    ScheduleBatch {
        calls: Vec<Call>,
        predecessor: H256,
        salt: H256,
        delay: u64,
    },
    Execute {
        call: Call,
        predecessor: H256,
        salt: H256,
    },
    ExecuteBatch {
        calls: Vec<Call>,
        predecessor: H256,
        salt: H256,
    },
    Cancel {
        id: H256,
    },
    UpdateDelay {
        delay: u64,
    },
    GrantRole {
        role: TimelockRole,
        account: Address,
    },
    RevokeRole {
        role: TimelockRole,
        account: Address,
    },
    RenounceRole {
        role: TimelockRole,
        account: Address,
    },

    // Governor
    Propose {
        calls: Vec<Call>,
        description: String,
    },
    CastVote {
        proposal_id: H256,
        support: VoteType,
        reason: Option<String>,
    },
    Queue {
        calls: Vec<Call>,
        description_hash: H256,
    },
    ExecuteProposal {
        calls: Vec<Call>,
        description_hash: H256,
    },
    CancelProposal {
        calls: Vec<Call>,
        description_hash: H256,
    },
    SetVotingDelay {
        blocks: u64,
    },
    SetVotingPeriod {
        blocks: u64,
    },
    SetProposalThreshold {
        amount: Amount,
    },
    SetQuorumBps {
        bps: u16,
    },
    SetGuardian {
        guardian: Address,
    },
}

impl Action {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }

    /// Entry point name, for logs and rejection messages
    pub fn name(&self) -> &'static str {
        match self {
            Action::Transfer { .. } => "transfer",
            Action::Approve { .. } => "approve",
            Action::TransferFrom { .. } => "transferFrom",
            Action::Delegate { .. } => "delegate",
            Action::Permit { .. } => "permit",
            Action::TransferOwnership { .. } => "transferOwnership",
            Action::RenounceOwnership => "renounceOwnership",
            Action::SetBuyTax { .. } => "setBuyTax",
            Action::SetSellTax { .. } => "setSellTax",
            Action::SetMaxTransactionAmount { .. } => "setMaxTransactionAmount",
            Action::SetMaxWalletAmount { .. } => "setMaxWalletAmount",
            Action::SetTaxRecipient { .. } => "setTaxRecipient",
            Action::SetTradingEnabled { .. } => "setTradingEnabled",
            Action::SetAmmPair { .. } => "setAmmPair",
            Action::SetTaxExempt { .. } => "setTaxExempt",
            Action::SetLimitExempt { .. } => "setLimitExempt",
            Action::Stake { .. } => "stake",
            Action::Withdraw { .. } => "withdraw",
            Action::ClaimRewards => "claimRewards",
            Action::AddRewards { .. } => "addRewards",
            Action::SetMinLockPeriod { .. } => "setMinLockPeriod",
            Action::Distribute => "distribute",
            Action::SetShares { .. } => "setShares",
            Action::SetDevWallet { .. } => "setDevWallet",
            Action::SetStakingVault { .. } => "setStakingVault",
            Action::Schedule { .. } => "schedule",
            Action::ScheduleBatch { .. } => "scheduleBatch",
            Action::Execute { .. } => "execute",
            Action::ExecuteBatch { .. } => "executeBatch",
            Action::Cancel { .. } => "cancel",
            Action::UpdateDelay { .. } => "updateDelay",
            Action::GrantRole { .. } => "grantRole",
            Action::RevokeRole { .. } => "revokeRole",
            Action::RenounceRole { .. } => "renounceRole",
            Action::Propose { .. } => "propose",
            Action::CastVote { .. } => "castVote",
            Action::Queue { .. } => "queue",
            Action::ExecuteProposal { .. } => "executeProposal",
            Action::CancelProposal { .. } => "cancelProposal",
            Action::SetVotingDelay { .. } => "setVotingDelay",
            Action::SetVotingPeriod { .. } => "setVotingPeriod",
            Action::SetProposalThreshold { .. } => "setProposalThreshold",
            Action::SetQuorumBps { .. } => "setQuorumBps",
            Action::SetGuardian { .. } => "setGuardian",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_codec() {
        let action = Action::SetShares {
            staking_bps: 6000,
            burn_bps: 1500,
            dev_bps: 2500,
        };
        let data = action.encode().unwrap();
        assert_eq!(Action::decode(&data).unwrap(), action);
    }

    #[test]
    fn test_decode_garbage_is_codec_error() {
        let err = Action::decode(&[0xff, 0xff, 0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, DaoError::Codec(_)));
    }

    #[test]
    fn test_hash_calls_is_order_sensitive() {
        let a = Call::action(Address::from_label("a"), &Action::Distribute).unwrap();
        let b = Call::transfer_value(Address::from_label("b"), 5);
        assert_ne!(
            hash_calls(&[a.clone(), b.clone()]),
            hash_calls(&[b, a])
        );
    }

    #[test]
    fn test_vote_type_wire_values() {
        assert_eq!(VoteType::from_u8(0).unwrap(), VoteType::Against);
        assert_eq!(VoteType::from_u8(1).unwrap(), VoteType::For);
        assert_eq!(VoteType::from_u8(2).unwrap(), VoteType::Abstain);
        assert!(VoteType::from_u8(3).is_err());
        assert_eq!(VoteType::Abstain.as_u8(), 2);
    }
}
