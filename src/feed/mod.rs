//! Feed decoding: normalizing RSS 2.0 and Atom documents into one entry
//! model, and extracting the entries newer than a watermark.
//!
//! The module is organized into three submodules:
//!
//! - [`timestamp`] - Multi-layout timestamp parsing (feeds disagree wildly
//!   about date encodings)
//! - [`parser`] - Schema-tolerant decoding of raw bytes into [`ParsedFeed`]
//! - [`extract`] - Incremental extraction of events newer than a watermark
//!
//! Data flow: raw bytes → [`parse`] → [`ParsedFeed`] → [`extract`] (+
//! watermark) → ordered events.

pub mod extract;
pub mod parser;
pub mod timestamp;

pub use extract::extract;
pub use parser::{parse, ParseError, ParsedFeed, RawEntry};
