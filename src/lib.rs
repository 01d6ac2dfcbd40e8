//! Core library for the notifeed daemon.
//!
//! notifeed polls a configured set of RSS/Atom feeds on an interval and
//! delivers every entry published since the previous poll of that feed as a
//! CloudEvents-style notification (binary content mode: `ce-*` headers plus
//! a JSON body) to a receiver endpoint.
//!
//! Pipeline, per feed, per cycle:
//!
//! ```text
//! transport::fetch → feed::parse → feed::extract → envelope::encode → transport::deliver
//! ```
//!
//! The binary in `main.rs` adds the scheduler around this: one cycle at
//! startup, then one per configured interval, until SIGTERM.

pub mod config;
pub mod envelope;
pub mod event;
pub mod feed;
pub mod poller;
pub mod transport;
pub mod util;
