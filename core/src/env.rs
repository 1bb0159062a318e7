//! Execution environment handed to every contract entry point

use serde::{Deserialize, Serialize};

use crate::error::{DaoError, Result};
use crate::event::{Event, EventRecord};
use crate::types::{Address, BlockNumber, Timestamp};

/// Maximum nesting of contract-to-contract calls inside one transaction
pub const MAX_CALL_DEPTH: u32 = 32;

/// Block context a transaction executes in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Env {
    pub block: BlockNumber,
    pub timestamp: Timestamp,
    pub chain_id: u64,
}

impl Env {
    pub fn new(block: BlockNumber, timestamp: Timestamp, chain_id: u64) -> Self {
        Self {
            block,
            timestamp,
            chain_id,
        }
    }
}

/// Per-transaction scratch state: the block context, the events emitted so
/// far and the current call depth. Dropped without committing when the
/// transaction fails.
#[derive(Debug, Clone)]
pub struct ExecContext {
    pub env: Env,
    events: Vec<EventRecord>,
    depth: u32,
}

impl ExecContext {
    pub fn new(env: Env) -> Self {
        Self {
            env,
            events: Vec::new(),
            depth: 0,
        }
    }

    pub fn block(&self) -> BlockNumber {
        self.env.block
    }

    pub fn timestamp(&self) -> Timestamp {
        self.env.timestamp
    }

    pub fn emit(&mut self, emitter: Address, event: Event) {
        self.events.push(EventRecord {
            block: self.env.block,
            timestamp: self.env.timestamp,
            emitter,
            event,
        });
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub fn into_events(self) -> Vec<EventRecord> {
        self.events
    }

    pub fn enter_call(&mut self) -> Result<()> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(DaoError::InvalidState(format!(
                "call depth exceeds {MAX_CALL_DEPTH}"
            )));
        }
        self.depth += 1;
        Ok(())
    }

    pub fn exit_call(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_stamps_block_context() {
        let mut ctx = ExecContext::new(Env::new(7, 1_000, 31337));
        ctx.emit(Address::BURN, Event::TradingEnabled { enabled: true });
        let events = ctx.into_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].block, 7);
        assert_eq!(events[0].timestamp, 1_000);
        assert_eq!(events[0].emitter, Address::BURN);
    }

    #[test]
    fn test_call_depth_is_bounded() {
        let mut ctx = ExecContext::new(Env::new(1, 1, 1));
        for _ in 0..MAX_CALL_DEPTH {
            ctx.enter_call().unwrap();
        }
        assert!(ctx.enter_call().is_err());
        ctx.exit_call();
        assert!(ctx.enter_call().is_ok());
    }
}
