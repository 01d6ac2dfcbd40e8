use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::Reader;
use thiserror::Error;

use crate::feed::timestamp::{self, TimeParseError};

/// Maximum element nesting depth accepted from a remote document.
/// Prevents stack abuse from maliciously deep XML.
const MAX_XML_DEPTH: usize = 50;

/// Errors that can occur while decoding feed bytes.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The bytes are not well-formed XML.
    #[error("XML parse error: {0}")]
    Xml(String),

    /// Well-formed XML, but neither an RSS channel nor an Atom feed.
    #[error("Document is not an RSS or Atom feed")]
    NotAFeed,

    /// Nesting depth exceeds the safety limit.
    #[error("XML nesting depth exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),

    /// A publish/update timestamp matched none of the supported layouts.
    /// Fails the whole document, not just the entry carrying it.
    #[error(transparent)]
    Timestamp(#[from] TimeParseError),
}

/// A feed document normalized across the RSS and Atom shapes.
///
/// Built fresh per fetch and consumed by value by the extraction step.
/// `link` is left exactly as decoded — possibly empty for RSS documents
/// whose channel omits it; the caller substitutes the fetch URL in that
/// case, since the parser never sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFeed {
    pub title: String,
    pub link: String,
    /// Entries in document order.
    pub entries: Vec<RawEntry>,
}

/// One item/entry element, normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    pub title: String,
    pub link: String,
    /// Publish (RSS) or update (Atom) instant. An entry without one decodes
    /// to the Unix epoch, which is never strictly after a live watermark.
    pub published_at: DateTime<Utc>,
}

/// Which text-bearing element is currently being read.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TextField {
    ChannelTitle,
    ChannelLink,
    ItemTitle,
    ItemLink,
    ItemPubDate,
    FeedTitle,
    EntryTitle,
    EntryUpdated,
}

/// A structured Atom `<link>` element. The URL lives in `href`; `rel`
/// selects among siblings.
#[derive(Debug, Default)]
struct AtomLink {
    rel: String,
    href: String,
}

#[derive(Debug, Default)]
struct EntryAcc {
    title: String,
    link: String,
    links: Vec<AtomLink>,
    published_at: Option<DateTime<Utc>>,
}

impl EntryAcc {
    fn into_rss_entry(self) -> RawEntry {
        RawEntry {
            title: self.title,
            link: self.link,
            published_at: self.published_at.unwrap_or(DateTime::UNIX_EPOCH),
        }
    }

    fn into_atom_entry(self) -> RawEntry {
        RawEntry {
            title: self.title,
            link: pick_link(&self.links),
            published_at: self.published_at.unwrap_or(DateTime::UNIX_EPOCH),
        }
    }
}

/// Accumulates both candidate shapes during a single pass; which one the
/// document actually is gets decided at the end (channel-present wins).
#[derive(Debug, Default)]
struct FeedAssembler {
    // RSS shape
    channel: Option<ChannelAcc>,
    item: Option<EntryAcc>,

    // Atom shape
    feed_title: String,
    feed_links: Vec<AtomLink>,
    atom_entries: Vec<RawEntry>,
    entry: Option<EntryAcc>,
    atom_shaped: bool,
}

#[derive(Debug, Default)]
struct ChannelAcc {
    title: String,
    link: String,
    items: Vec<RawEntry>,
}

/// Decodes raw feed bytes into a [`ParsedFeed`], recognizing the RSS 2.0
/// and Atom shapes by structural probing.
///
/// Decoding is schema-tolerant: unknown elements are skipped, and missing
/// optional elements yield empty strings or the epoch instant. Matching is
/// restricted to direct children of the expected containers, so a `<title>`
/// buried inside `<image>` or `<source>` never leaks into the result, and a
/// namespaced `<atom:link>` inside an RSS channel is not mistaken for the
/// channel link.
///
/// # Errors
///
/// - [`ParseError::Xml`] — the bytes are not well-formed XML
/// - [`ParseError::NotAFeed`] — well-formed, but neither shape is present
/// - [`ParseError::Timestamp`] — an entry timestamp matched no known layout
/// - [`ParseError::MaxDepthExceeded`] — pathological nesting
pub fn parse(bytes: &[u8]) -> Result<ParsedFeed, ParseError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut asm = FeedAssembler::default();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut field: Option<(TextField, usize)> = None;
    let mut text = String::new();

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(XmlEvent::Start(e)) => {
                if stack.len() >= MAX_XML_DEPTH {
                    return Err(ParseError::MaxDepthExceeded(MAX_XML_DEPTH));
                }
                if field.is_none() {
                    if let Some(f) = asm.open(&e, &stack, &reader)? {
                        field = Some((f, stack.len()));
                        text.clear();
                    }
                }
                stack.push(e.name().as_ref().to_vec());
            }
            Ok(XmlEvent::Empty(e)) => {
                // Self-closing element: open and close in one step. A
                // self-closing text field commits as the empty string.
                if field.is_none() {
                    if let Some(f) = asm.open(&e, &stack, &reader)? {
                        asm.commit(f, "")?;
                    } else {
                        asm.close(e.name().as_ref());
                    }
                }
            }
            Ok(XmlEvent::Text(t)) => {
                if field.is_some() {
                    let chunk = t.unescape().map_err(|e| ParseError::Xml(e.to_string()))?;
                    text.push_str(&chunk);
                }
            }
            Ok(XmlEvent::CData(t)) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Ok(XmlEvent::End(e)) => {
                stack.pop();
                if let Some((f, depth)) = field {
                    if stack.len() == depth {
                        asm.commit(f, &text)?;
                        field = None;
                    }
                } else {
                    asm.close(e.name().as_ref());
                }
            }
            Ok(XmlEvent::Eof) => break,
            Err(e) => return Err(ParseError::Xml(e.to_string())),
            Ok(_) => {}
        }
        buf.clear();
    }

    asm.finish()
}

impl FeedAssembler {
    /// Handles an opening tag. Returns the text field it begins, if any.
    fn open(
        &mut self,
        e: &BytesStart<'_>,
        stack: &[Vec<u8>],
        reader: &Reader<&[u8]>,
    ) -> Result<Option<TextField>, ParseError> {
        let name = e.name();
        let at_root_level = stack.len() == 1;
        let parent = stack.last().map(Vec::as_slice);

        if stack.is_empty() && e.local_name().as_ref() == b"feed" {
            self.atom_shaped = true;
        }

        match name.as_ref() {
            b"channel" if at_root_level && self.channel.is_none() => {
                self.channel = Some(ChannelAcc::default());
            }
            b"item" if self.channel.is_some() && parent == Some(b"channel".as_slice()) => {
                self.item = Some(EntryAcc::default());
            }
            b"entry" if at_root_level => {
                self.atom_shaped = true;
                self.entry = Some(EntryAcc::default());
            }
            b"title" => {
                if self.item.is_some() && parent == Some(b"item".as_slice()) {
                    return Ok(Some(TextField::ItemTitle));
                } else if self.entry.is_some() && parent == Some(b"entry".as_slice()) {
                    return Ok(Some(TextField::EntryTitle));
                } else if parent == Some(b"channel".as_slice()) {
                    return Ok(Some(TextField::ChannelTitle));
                } else if at_root_level {
                    self.atom_shaped = true;
                    return Ok(Some(TextField::FeedTitle));
                }
            }
            b"link" => {
                if self.entry.is_some() && parent == Some(b"entry".as_slice()) {
                    let link = read_link_attributes(e, reader)?;
                    if let Some(entry) = self.entry.as_mut() {
                        entry.links.push(link);
                    }
                } else if at_root_level {
                    self.atom_shaped = true;
                    self.feed_links.push(read_link_attributes(e, reader)?);
                } else if self.item.is_some() && parent == Some(b"item".as_slice()) {
                    return Ok(Some(TextField::ItemLink));
                } else if parent == Some(b"channel".as_slice()) {
                    return Ok(Some(TextField::ChannelLink));
                }
            }
            b"pubDate" if self.item.is_some() && parent == Some(b"item".as_slice()) => {
                return Ok(Some(TextField::ItemPubDate));
            }
            b"updated" if self.entry.is_some() && parent == Some(b"entry".as_slice()) => {
                return Ok(Some(TextField::EntryUpdated));
            }
            _ => {}
        }

        Ok(None)
    }

    /// Commits accumulated text to the field's destination. Duplicate
    /// elements overwrite: last one wins.
    fn commit(&mut self, field: TextField, text: &str) -> Result<(), ParseError> {
        match field {
            TextField::ChannelTitle => {
                if let Some(ch) = self.channel.as_mut() {
                    ch.title = text.to_string();
                }
            }
            TextField::ChannelLink => {
                if let Some(ch) = self.channel.as_mut() {
                    ch.link = text.to_string();
                }
            }
            TextField::ItemTitle => {
                if let Some(item) = self.item.as_mut() {
                    item.title = text.to_string();
                }
            }
            TextField::ItemLink => {
                if let Some(item) = self.item.as_mut() {
                    item.link = text.to_string();
                }
            }
            TextField::ItemPubDate => {
                if let Some(item) = self.item.as_mut() {
                    item.published_at = Some(timestamp::parse(text)?);
                }
            }
            TextField::FeedTitle => self.feed_title = text.to_string(),
            TextField::EntryTitle => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.title = text.to_string();
                }
            }
            TextField::EntryUpdated => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.published_at = Some(timestamp::parse(text)?);
                }
            }
        }
        Ok(())
    }

    /// Handles a closing tag for container elements.
    fn close(&mut self, name: &[u8]) {
        match name {
            b"item" => {
                if let (Some(item), Some(ch)) = (self.item.take(), self.channel.as_mut()) {
                    ch.items.push(item.into_rss_entry());
                }
            }
            b"entry" => {
                if let Some(entry) = self.entry.take() {
                    self.atom_entries.push(entry.into_atom_entry());
                }
            }
            _ => {}
        }
    }

    /// Resolves the probed shape. A present channel wins over any
    /// Atom-shaped fields in the same document.
    fn finish(self) -> Result<ParsedFeed, ParseError> {
        if let Some(ch) = self.channel {
            return Ok(ParsedFeed {
                title: ch.title,
                link: ch.link,
                entries: ch.items,
            });
        }
        if self.atom_shaped {
            return Ok(ParsedFeed {
                title: self.feed_title,
                link: pick_link(&self.feed_links),
                entries: self.atom_entries,
            });
        }
        Err(ParseError::NotAFeed)
    }
}

/// Picks the canonical URL among sibling Atom links: the first with
/// `rel="alternate"` (or no rel, the Atom default), else the first present.
fn pick_link(links: &[AtomLink]) -> String {
    links
        .iter()
        .find(|l| l.rel.is_empty() || l.rel == "alternate")
        .or_else(|| links.first())
        .map(|l| l.href.clone())
        .unwrap_or_default()
}

fn read_link_attributes(
    e: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
) -> Result<AtomLink, ParseError> {
    let mut link = AtomLink::default();
    let decoder = reader.decoder();
    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed link attribute");
                continue;
            }
        };
        match attr.key.as_ref() {
            b"href" => {
                link.href = attr
                    .decode_and_unescape_value(decoder)
                    .map_err(|e| ParseError::Xml(e.to_string()))?
                    .to_string();
            }
            b"rel" => {
                link.rel = attr
                    .decode_and_unescape_value(decoder)
                    .map_err(|e| ParseError::Xml(e.to_string()))?
                    .to_string();
            }
            _ => {}
        }
    }
    Ok(link)
}

// ============================================================================
// Tests
// ============================================================================
