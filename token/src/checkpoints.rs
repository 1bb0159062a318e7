//! Block-indexed history of a single value

use dao_core::{Amount, BlockNumber, DaoError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub block: BlockNumber,
    pub votes: Amount,
}

/// Ordered `(block, value)` pairs, strictly increasing in block. A write in
/// the same block as the last entry overwrites it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoints(Vec<Checkpoint>);

impl Checkpoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<Checkpoint> {
        self.0.get(pos).copied()
    }

    /// Most recent value, zero when no checkpoint exists
    pub fn latest(&self) -> Amount {
        self.0.last().map(|c| c.votes).unwrap_or(0)
    }

    /// Records `votes` at `block` and returns `(previous, new)`
    pub fn push(&mut self, block: BlockNumber, votes: Amount) -> Result<(Amount, Amount)> {
        let previous = self.latest();
        match self.0.last_mut() {
            Some(last) if last.block > block => {
                return Err(DaoError::InvalidBlock {
                    requested: block,
                    current: last.block,
                });
            }
            Some(last) if last.block == block => last.votes = votes,
            _ => self.0.push(Checkpoint { block, votes }),
        }
        Ok((previous, votes))
    }

    /// Value of the last checkpoint whose block is `<= block`
    pub fn upper_lookup(&self, block: BlockNumber) -> Amount {
        let idx = self.0.partition_point(|c| c.block <= block);
        if idx == 0 {
            0
        } else {
            self.0[idx - 1].votes
        }
    }
}
