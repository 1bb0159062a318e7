//! Committed event history
//!
//! Stores every event of every successful transaction in order. Queries
//! filter by emitter, event name and block range; `pages` walks a range in
//! fixed-size block windows the way a remote indexer would.

use dao_core::{Address, BlockNumber, EventRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

/// Conjunction of optional criteria; the default matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub emitter: Option<Address>,
    pub name: Option<String>,
    pub from_block: BlockNumber,
    /// Inclusive; `None` means the latest block
    pub to_block: Option<BlockNumber>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emitter(mut self, emitter: Address) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn blocks(mut self, from: BlockNumber, to: Option<BlockNumber>) -> Self {
        self.from_block = from;
        self.to_block = to;
        self
    }

    pub fn matches(&self, record: &EventRecord) -> bool {
        self.emitter.map_or(true, |e| e == record.emitter)
            && self
                .name
                .as_deref()
                .map_or(true, |n| n == record.event.name())
            && record.block >= self.from_block
            && self.to_block.map_or(true, |to| record.block <= to)
    }
}

/// One window of a paged query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPage<'a> {
    pub from_block: BlockNumber,
    pub to_block: BlockNumber,
    pub records: Vec<&'a EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn append(&mut self, records: impl IntoIterator<Item = EventRecord>) {
        self.records.extend(records);
    }

    pub fn latest_block(&self) -> BlockNumber {
        self.records.last().map(|r| r.block).unwrap_or(0)
    }

    pub fn query(&self, filter: &EventFilter) -> Vec<&EventRecord> {
        self.records.iter().filter(|r| filter.matches(r)).collect()
    }

    /// Splits the filter's block range into windows of `page_blocks` blocks.
    /// Empty windows are yielded too so callers can track progress.
    pub fn pages<'a>(
        &'a self,
        filter: &'a EventFilter,
        page_blocks: u64,
    ) -> impl Iterator<Item = EventPage<'a>> + 'a {
        let page_blocks = page_blocks.max(1);
        let last = filter.to_block.unwrap_or_else(|| self.latest_block());
        let mut next = Some(filter.from_block).filter(|from| *from <= last);
        std::iter::from_fn(move || {
            let from = next?;
            let to = from.saturating_add(page_blocks - 1).min(last);
            next = to.checked_add(1).filter(|n| *n <= last);
            let window = EventFilter {
                from_block: from,
                to_block: Some(to),
                ..filter.clone()
            };
            let records = self.records.iter().filter(|r| window.matches(r)).collect();
            Some(EventPage {
                from_block: from,
                to_block: to,
                records,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dao_core::{Event, H256};

    fn record(block: BlockNumber, emitter: &str, event: Event) -> EventRecord {
        EventRecord {
            block,
            timestamp: block * 3,
            emitter: Address::from_label(emitter),
            event,
        }
    }

    fn sample() -> EventLog {
        let mut log = EventLog::new();
        log.append([
            record(1, "token", Event::Transfer {
                from: Address::ZERO,
                to: Address::from_label("a"),
                amount: 5,
            }),
            record(3, "gov", Event::ProposalExecuted {
                proposal_id: H256::ZERO,
            }),
            record(7, "gov", Event::ProposalCanceled {
                proposal_id: H256::ZERO,
            }),
            record(12, "token", Event::Transfer {
                from: Address::from_label("a"),
                to: Address::from_label("b"),
                amount: 1,
            }),
        ]);
        log
    }

    #[test]
    fn test_query_filters_combine() {
        let log = sample();
        assert_eq!(log.query(&EventFilter::new()).len(), 4);
        let gov = EventFilter::new().emitter(Address::from_label("gov"));
        assert_eq!(log.query(&gov).len(), 2);
        let transfers = EventFilter::new().name("Transfer").blocks(2, None);
        let hits = log.query(&transfers);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].block, 12);
    }

    #[test]
    fn test_pages_cover_range_once() {
        let log = sample();
        let filter = EventFilter::new();
        let pages: Vec<_> = log.pages(&filter, 5).collect();
        let bounds: Vec<_> = pages.iter().map(|p| (p.from_block, p.to_block)).collect();
        assert_eq!(bounds, vec![(0, 4), (5, 9), (10, 12)]);
        let total: usize = pages.iter().map(|p| p.records.len()).sum();
        assert_eq!(total, log.len());
    }

    #[test]
    fn test_pages_empty_range() {
        let log = sample();
        let filter = EventFilter::new().blocks(20, Some(10));
        assert_eq!(log.pages(&filter, 5).count(), 0);
    }
}
