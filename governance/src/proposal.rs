//! Proposal records and tallies

use dao_core::{checked_add, Address, Amount, BlockNumber, Call, Result, Timestamp, VoteType, H256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle states, numbered as exposed by `state`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalState {
    Pending,
    Active,
    Canceled,
    Defeated,
    Succeeded,
    Queued,
    Expired,
    Executed,
}

impl ProposalState {
    /// Final states admit no further transition
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            ProposalState::Canceled
                | ProposalState::Defeated
                | ProposalState::Expired
                | ProposalState::Executed
        )
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Tally of weighted votes per ballot option
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalVotes {
    pub against: Amount,
    pub for_votes: Amount,
    pub abstain: Amount,
}

impl ProposalVotes {
    pub fn add(&mut self, support: VoteType, weight: Amount) -> Result<()> {
        let slot = match support {
            VoteType::Against => &mut self.against,
            VoteType::For => &mut self.for_votes,
            VoteType::Abstain => &mut self.abstain,
        };
        *slot = checked_add(*slot, weight)?;
        Ok(())
    }

    /// Votes that count toward quorum
    pub fn quorum_votes(&self) -> Amount {
        self.for_votes.saturating_add(self.abstain)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub support: VoteType,
    pub weight: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: H256,
    pub proposer: Address,
    pub calls: Vec<Call>,
    pub description: String,
    pub description_hash: H256,
    /// Voting power is read at the end of this block
    pub snapshot: BlockNumber,
    /// Last block in which votes are accepted
    pub deadline: BlockNumber,
    pub votes: ProposalVotes,
    pub receipts: BTreeMap<Address, Receipt>,
    pub canceled: bool,
    pub executed: bool,
    /// Set when queued
    pub eta: Option<Timestamp>,
    pub timelock_id: Option<H256>,
}

impl Proposal {
    pub fn has_voted(&self, account: Address) -> bool {
        self.receipts.contains_key(&account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_by_support() {
        let mut votes = ProposalVotes::default();
        votes.add(VoteType::For, 10).unwrap();
        votes.add(VoteType::Against, 4).unwrap();
        votes.add(VoteType::Abstain, 3).unwrap();
        votes.add(VoteType::For, 1).unwrap();
        assert_eq!((votes.against, votes.for_votes, votes.abstain), (4, 11, 3));
        assert_eq!(votes.quorum_votes(), 14);
    }

    #[test]
    fn test_tally_overflow() {
        let mut votes = ProposalVotes::default();
        votes.add(VoteType::For, Amount::MAX).unwrap();
        assert!(votes.add(VoteType::For, 1).is_err());
    }

    #[test]
    fn test_final_states() {
        assert!(ProposalState::Executed.is_final());
        assert!(ProposalState::Defeated.is_final());
        assert!(!ProposalState::Queued.is_final());
        assert_eq!(ProposalState::Succeeded.to_string(), "Succeeded");
    }
}
