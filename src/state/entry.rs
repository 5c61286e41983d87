//! Last-known value of one data kind.

use std::time::Duration;
use tokio::time::Instant;

use crate::codec::Payload;

/// Snapshot of one slot: the most recent payload and when it arrived.
///
/// Entries are replaced whole, never mutated in place, so a reader holding a
/// snapshot always sees fields from a single receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct StateEntry {
    /// `None` until the first frame of this kind arrives.
    pub value: Option<Payload>,
    pub received_at: Option<Instant>,
    /// Number of receipts so far; advances by one per dispatch.
    pub sequence: u64,
}

impl StateEntry {
    /// The "not yet received" sentinel.
    pub const fn absent() -> Self {
        Self { value: None, received_at: None, sequence: 0 }
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    /// Time since receipt, or `None` if never received.
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.received_at.map(|at| now.saturating_duration_since(at))
    }

    pub(crate) fn next(&self, value: Payload, now: Instant) -> Self {
        Self { value: Some(value), received_at: Some(now), sequence: self.sequence + 1 }
    }
}

impl Default for StateEntry {
    fn default() -> Self {
        Self::absent()
    }
}
