use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

/// Errors that can occur while parsing a feed timestamp.
#[derive(Debug, Error)]
pub enum TimeParseError {
    /// The text matched none of the supported layouts.
    #[error("Unrecognized time format: {0}")]
    Unrecognized(String),
}

/// One entry in the ordered layout list.
enum Layout {
    /// Civil time followed by a named zone abbreviation (`GMT`, `EST`, ...).
    /// Abbreviations carry no reliable offset, so the civil time is read as
    /// UTC. The format string omits the zone token; it is split off and
    /// checked separately.
    NamedZone(&'static str),
    /// Civil time followed by a numeric offset (`-0700`, `+09:00`).
    Offset(&'static str),
    /// RFC 3339, with or without fractional seconds.
    Rfc3339,
    /// Calendar date only; read as midnight UTC.
    DateOnly(&'static str),
}

/// Supported layouts, tried in order. The first successful parse wins, so
/// the order is part of the contract for inputs that could satisfy more
/// than one layout. Feeds in the wild use all of these.
const LAYOUTS: &[Layout] = &[
    Layout::NamedZone("%d %b %y %H:%M"),        // RFC 822
    Layout::Offset("%d %b %y %H:%M %z"),        // RFC 822 with numeric zone
    Layout::NamedZone("%A, %d-%b-%y %H:%M:%S"), // RFC 850
    Layout::NamedZone("%a, %d %b %Y %H:%M:%S"), // RFC 1123
    Layout::Offset("%a, %d %b %Y %H:%M:%S %z"), // RFC 1123 with numeric zone
    Layout::Rfc3339,                            // RFC 3339, fractional seconds included
    Layout::DateOnly("%Y-%m-%d"),
    Layout::Offset("%Y-%m-%dT%H:%M:%S%:z"),     // datetime with explicit offset
];

/// Parses a timestamp of unknown format into a UTC instant by trying each
/// supported layout in order.
///
/// # Errors
///
/// Returns [`TimeParseError::Unrecognized`] when no layout matches.
pub fn parse(text: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let trimmed = text.trim();
    LAYOUTS
        .iter()
        .find_map(|layout| layout.try_parse(trimmed))
        .ok_or_else(|| TimeParseError::Unrecognized(text.to_string()))
}

impl Layout {
    fn try_parse(&self, s: &str) -> Option<DateTime<Utc>> {
        match self {
            Layout::NamedZone(fmt) => {
                // The zone token must be purely alphabetic; numeric offsets
                // belong to the Offset layouts and must not be swallowed here.
                let (head, zone) = s.rsplit_once(' ')?;
                if zone.is_empty() || !zone.bytes().all(|b| b.is_ascii_alphabetic()) {
                    return None;
                }
                let naive = NaiveDateTime::parse_from_str(head.trim_end(), fmt).ok()?;
                Some(Utc.from_utc_datetime(&naive))
            }
            Layout::Offset(fmt) => DateTime::parse_from_str(s, fmt)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            Layout::Rfc3339 => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            Layout::DateOnly(fmt) => {
                let date = NaiveDate::parse_from_str(s, fmt).ok()?;
                Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
