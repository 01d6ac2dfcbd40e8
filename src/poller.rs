//! The poll orchestrator: fetch each configured feed, work out which
//! entries are new since the last poll, and deliver one event per new entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::envelope;
use crate::event::Event;
use crate::feed;
use crate::transport;

/// Per-feed last-fetch instants, keyed by feed URL.
///
/// Held only in memory — lost on restart, by design: after a restart every
/// feed starts over with an absent watermark, so the first poll emits
/// nothing rather than a historical backlog.
///
/// The mutex keeps individual reads and writes untorn across overlapping
/// poll cycles. It does not serialize a whole cycle's read-then-write
/// against another cycle's: two overlapping cycles touching the same feed
/// can still lose one update. Known hazard, accepted; see DESIGN.md.
#[derive(Debug, Default)]
pub struct Watermarks {
    inner: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl Watermarks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The instant this feed was last successfully fetched, if ever.
    pub fn get(&self, feed_url: &str) -> Option<DateTime<Utc>> {
        self.lock().get(feed_url).copied()
    }

    pub fn set(&self, feed_url: &str, at: DateTime<Utc>) {
        self.lock().insert(feed_url.to_string(), at);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        // A panic while holding this lock cannot leave the map in a bad
        // state (single insert/lookup), so a poisoned lock is still usable
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs poll cycles against the configured feeds.
///
/// Cheap to clone (shared client and state), so the scheduler can hand a
/// copy to each spawned cycle.
#[derive(Clone)]
pub struct Poller {
    client: reqwest::Client,
    config: Arc<Config>,
    watermarks: Arc<Watermarks>,
}

impl Poller {
    pub fn new(client: reqwest::Client, config: Arc<Config>, watermarks: Arc<Watermarks>) -> Self {
        Self {
            client,
            config,
            watermarks,
        }
    }

    /// One complete poll cycle: collect new events across every configured
    /// feed, then deliver them one at a time.
    ///
    /// Never fails — every per-feed and per-event failure is logged and
    /// skipped, and the cycle carries on.
    pub async fn run_cycle(&self) {
        let events = self.collect().await;

        for event in &events {
            let env = match envelope::encode(event) {
                Ok(env) => env,
                Err(e) => {
                    tracing::warn!(entry = %event.entry.url, error = %e, "Failed to encode event");
                    continue;
                }
            };
            if let Err(e) = transport::deliver(&self.client, &self.config.endpoint, &env).await {
                tracing::warn!(entry = %event.entry.url, error = %e, "Failed to deliver event");
                continue;
            }
            tracing::info!(entry = %event.entry.url, "notified");
        }
    }

    /// Fetches and extracts across all feeds, in configured order.
    async fn collect(&self) -> Vec<Event> {
        let mut events = Vec::new();

        for feed_url in &self.config.feeds {
            let now = Utc::now();
            // An absent watermark defaults to now: a feed's first-ever poll
            // establishes the baseline and emits nothing.
            let since = self.watermarks.get(feed_url).unwrap_or(now);

            let bytes = match transport::fetch(&self.client, feed_url).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(feed = %feed_url, error = %e, "Unable to fetch feed");
                    continue;
                }
            };

            // Advance the watermark on fetch success, before parsing: a
            // malformed document must not cause a later successful poll to
            // backfill the entries it covered.
            self.watermarks.set(feed_url, now);
            tracing::info!(feed = %feed_url, "fetched");

            let mut parsed = match feed::parse(&bytes) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(feed = %feed_url, error = %e, "Failed to parse feed");
                    continue;
                }
            };

            // Some producers omit the channel link; the document cannot
            // name its own fetch URL, so patch it in here
            if parsed.link.is_empty() {
                parsed.link = feed_url.clone();
            }

            events.extend(feed::extract(parsed, since));
        }

        events
    }
}
