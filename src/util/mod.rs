//! Shared utilities.
//!
//! Currently just URL sanity checking, used to flag misconfigured feed
//! URLs at startup.

mod url_check;

pub use url_check::{validate_url, UrlValidationError};
