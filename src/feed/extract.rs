use chrono::{DateTime, Utc};

use crate::event::{Event, EventEntry, EventFeed};
use crate::feed::parser::ParsedFeed;

/// Turns a parsed feed into the events newer than `since`.
///
/// Entries are compared with strict "after": an entry published exactly at
/// `since` is excluded, which keeps repeated runs against the same watermark
/// from re-emitting the boundary entry. Output order matches document order;
/// there is no re-sorting by timestamp. Never fails — an empty feed yields
/// an empty vector and empty fields pass through as empty strings.
pub fn extract(feed: ParsedFeed, since: DateTime<Utc>) -> Vec<Event> {
    let ParsedFeed {
        title,
        link,
        entries,
    } = feed;

    entries
        .into_iter()
        .filter(|entry| entry.published_at > since)
        .map(|entry| Event {
            feed: EventFeed {
                title: title.clone(),
                url: link.clone(),
            },
            entry: EventEntry {
                title: entry.title,
                url: entry.link,
                published_at: entry.published_at,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::parser::RawEntry;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn entry(title: &str, link: &str, published_at: DateTime<Utc>) -> RawEntry {
        RawEntry {
            title: title.to_string(),
            link: link.to_string(),
            published_at,
        }
    }

    fn feed(entries: Vec<RawEntry>) -> ParsedFeed {
        ParsedFeed {
            title: "Feed".to_string(),
            link: "https://feed.example.com".to_string(),
            entries,
        }
    }

    #[test]
    fn test_only_entries_strictly_after_since() {
        let t0 = Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap();
        let entries = vec![
            entry("older", "https://x/older", t0 - Duration::seconds(1)),
            entry("newer", "https://x/newer", t0 + Duration::seconds(1)),
        ];

        let events = extract(feed(entries), t0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].entry.title, "newer");
        assert_eq!(events[0].entry.url, "https://x/newer");
    }

    #[test]
    fn test_entry_exactly_at_since_excluded() {
        let t0 = Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap();
        let events = extract(feed(vec![entry("boundary", "https://x/b", t0)]), t0);
        assert!(events.is_empty());
    }

    #[test]
    fn test_document_order_preserved() {
        let t0 = Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap();
        // Deliberately not in chronological order
        let entries = vec![
            entry("c", "https://x/c", t0 + Duration::hours(3)),
            entry("a", "https://x/a", t0 + Duration::hours(1)),
            entry("b", "https://x/b", t0 + Duration::hours(2)),
        ];

        let events = extract(feed(entries), t0);
        let titles: Vec<_> = events.iter().map(|e| e.entry.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_empty_feed_yields_no_events() {
        let t0 = Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap();
        assert!(extract(feed(vec![]), t0).is_empty());
    }

    #[test]
    fn test_feed_fields_duplicated_into_each_event() {
        let t0 = Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap();
        let entries = vec![
            entry("one", "https://x/1", t0 + Duration::seconds(1)),
            entry("two", "https://x/2", t0 + Duration::seconds(2)),
        ];

        let events = extract(feed(entries), t0);
        assert_eq!(events.len(), 2);
        for event in &events {
            assert_eq!(event.feed.title, "Feed");
            assert_eq!(event.feed.url, "https://feed.example.com");
        }
    }

    #[test]
    fn test_empty_fields_pass_through() {
        let t0 = Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap();
        let parsed = ParsedFeed {
            title: String::new(),
            link: String::new(),
            entries: vec![entry("", "", t0 + Duration::seconds(1))],
        };

        let events = extract(parsed, t0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].feed.title, "");
        assert_eq!(events[0].entry.url, "");
    }
}
