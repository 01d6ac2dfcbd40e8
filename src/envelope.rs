//! CloudEvents binary-mode envelope codec.
//!
//! `encode` wraps an [`Event`] in the delivery attributes (mapped 1:1 onto
//! HTTP headers by the transport) plus a JSON body; `decode` inverts the
//! body. The attributes are delivery metadata, generated fresh on every
//! encode — they are deliberately not round-tripped into the event value.

use chrono::{SecondsFormat, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::event::Event;

/// CloudEvents spec version sent as `ce-specversion`.
pub const SPEC_VERSION: &str = "1.0";

/// Event type sent as `ce-type`.
pub const EVENT_TYPE: &str = "feed.publish";

/// Body content type.
pub const CONTENT_TYPE: &str = "application/json";

/// Client identification, product name plus the running version.
pub const USER_AGENT: &str = concat!("notifeed/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur while encoding or decoding an envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("JSON body error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One outbound notification, ready for HTTP delivery.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// `ce-specversion`
    pub spec_version: &'static str,
    /// `ce-type`
    pub event_type: &'static str,
    /// `ce-source`: the entry URL.
    pub source: String,
    /// `ce-id`: opaque, unique per encode.
    pub id: String,
    /// `ce-time`: emission wall-clock time, RFC 3339. Not the entry's
    /// publish time.
    pub time: String,
    /// `Content-Type`
    pub content_type: &'static str,
    /// `User-Agent`
    pub user_agent: &'static str,
    /// The event serialized as JSON.
    pub body: Vec<u8>,
}

/// Encodes an event into its delivery envelope.
///
/// Pure except for the id and emission timestamp: encoding the same event
/// twice yields two envelopes with distinct `id`s.
pub fn encode(event: &Event) -> Result<Envelope, EnvelopeError> {
    Ok(Envelope {
        spec_version: SPEC_VERSION,
        event_type: EVENT_TYPE,
        source: event.entry.url.clone(),
        id: Uuid::new_v4().to_string(),
        time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        content_type: CONTENT_TYPE,
        user_agent: USER_AGENT,
        body: serde_json::to_vec(event)?,
    })
}

/// Decodes the event back out of an envelope's body.
pub fn decode(envelope: &Envelope) -> Result<Event, EnvelopeError> {
    Ok(serde_json::from_slice(&envelope.body)?)
}
