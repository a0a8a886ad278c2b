//! Lifecycle state and counters of the ingestion loop.

use std::fmt;

/// Lifecycle state of the ingestion loop.
///
/// States only move forward: `Init → Subscribed → Polling → Draining → Closed`. A failed
/// subscription goes straight from `Init` to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    /// Created, not yet subscribed.
    #[default]
    Init,
    /// Subscribed to the topic, about to poll.
    Subscribed,
    /// Running poll → process → upsert cycles.
    Polling,
    /// Stopping: no more polls, closing the broker client.
    Draining,
    /// Broker client closed, offsets committed.
    Closed,
}

impl LoopState {
    /// Whether the loop has finished.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Subscribed => "subscribed",
            Self::Polling => "polling",
            Self::Draining => "draining",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Counters kept by the ingestion loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Non-empty batches handled.
    pub batches: u64,
    /// Records received from the broker.
    pub records_received: u64,
    /// Documents acknowledged by the search index.
    pub documents_upserted: u64,
    /// Records dropped because they could not be turned into a document.
    pub records_skipped: u64,
    /// Upserts rejected or failed by the search index.
    pub upserts_failed: u64,
}
