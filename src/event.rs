//! The outbound notification payload: one event per newly-seen feed entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A notification for a single newly-published entry.
///
/// Constructed by the extractor, serialized as the JSON body of the
/// delivery envelope. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub feed: EventFeed,
    pub entry: EventEntry,
}

/// The feed an entry came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFeed {
    pub title: String,
    /// Canonical feed URL; never empty — the poll loop substitutes the
    /// fetch URL when the document itself carries none.
    pub url: String,
}

/// The entry being announced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEntry {
    pub title: String,
    pub url: String,
    /// Publish instant, serialized as RFC 3339.
    pub published_at: DateTime<Utc>,
}
