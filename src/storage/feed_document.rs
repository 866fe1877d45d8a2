use std::collections::HashSet;
use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::domain::entry::ITUNES_NAMESPACE;
use crate::domain::{EntrySummary, FeedEntry};
use crate::errors::{FeederError, FeederResult};

const INDENT_UNIT: &str = "  ";

#[derive(Debug, Clone, Copy)]
enum Field {
    Guid,
    Title,
}

/// A parsed RSS document, kept as the event stream it was read from.
///
/// Rewriting replays that stream verbatim, so channel metadata, existing
/// items, comments and unknown extensions survive byte-for-byte; new items
/// are spliced in right before `</channel>`.
#[derive(Debug)]
pub struct FeedDocument {
    events: Vec<Event<'static>>,
    root: usize,
    channel_end: usize,
    /// Old XML declaration and the whitespace before `</channel>`
    skipped: Vec<usize>,
    item_indent: String,
    closing_indent: String,
    entries: Vec<EntrySummary>,
}

impl FeedDocument {
    pub fn parse(xml: &str) -> FeederResult<Self> {
        let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
        let mut reader = Reader::from_str(xml);

        let mut events: Vec<Event<'static>> = Vec::new();
        let mut depth = 0usize;
        let mut root = None;
        let mut channel_start = None;
        let mut channel_end = None;
        let mut skipped = Vec::new();
        let mut item_indent = None;
        let mut closing_indent = String::new();
        let mut entries = Vec::new();
        let mut current: Option<EntrySummary> = None;
        let mut field: Option<(Field, String)> = None;

        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(e) => {
                    return Err(malformed(format!(
                        "at byte {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
            };
            let index = events.len();
            let in_channel = channel_start.is_some() && channel_end.is_none();

            match &event {
                Event::Eof => break,
                Event::Decl(_) => skipped.push(index),
                Event::Text(text) if depth == 0 => {
                    // The declaration is regenerated together with its line break
                    if is_whitespace(text) && index > 0 && skipped.last() == Some(&(index - 1)) {
                        skipped.push(index);
                    }
                }
                Event::Start(start) | Event::Empty(start) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    let name = start.local_name();
                    let name = name.as_ref();

                    if depth == 0 {
                        if root.is_some() {
                            return Err(malformed("more than one root element"));
                        }
                        root = Some(index);
                    } else if depth == 1 && name == b"channel" && channel_start.is_none() {
                        if is_empty {
                            return Err(malformed("<channel> element is empty"));
                        }
                        channel_start = Some(index);
                    } else if depth == 2 && in_channel {
                        item_indent = Some(trailing_whitespace(&events));
                        if name == b"item" {
                            if is_empty {
                                entries.push(EntrySummary::default());
                            } else {
                                current = Some(EntrySummary::default());
                            }
                        }
                    } else if depth == 3 {
                        if let Some(summary) = current.as_mut() {
                            match name {
                                b"guid" if !is_empty => field = Some((Field::Guid, String::new())),
                                b"title" if !is_empty => {
                                    field = Some((Field::Title, String::new()))
                                }
                                b"enclosure" => summary.enclosure_url = attribute(start, b"url")?,
                                _ => {}
                            }
                        }
                    }

                    if !is_empty {
                        depth += 1;
                    }
                }
                Event::End(end) => {
                    if depth == 0 {
                        return Err(malformed("closing tag without an open element"));
                    }
                    depth -= 1;
                    let name = end.local_name();
                    let name = name.as_ref();

                    if depth == 1 && in_channel && name == b"channel" {
                        channel_end = Some(index);
                        if let Some(Event::Text(text)) = events.last() {
                            if is_whitespace(text) {
                                closing_indent = String::from_utf8_lossy(text).into_owned();
                                skipped.push(index - 1);
                            }
                        }
                    } else if depth == 2 && in_channel && name == b"item" {
                        if let Some(summary) = current.take() {
                            entries.push(summary);
                        }
                    } else if depth == 3 {
                        if let (Some(summary), Some((kind, text))) = (current.as_mut(), field.take()) {
                            let value = Some(text.trim().to_string()).filter(|t| !t.is_empty());
                            match kind {
                                Field::Guid => summary.guid = value,
                                Field::Title => summary.title = value,
                            }
                        }
                    }
                }
                Event::Text(text) if depth == 4 => {
                    if let Some((_, buf)) = field.as_mut() {
                        let text = text.unescape().map_err(|e| malformed(e.to_string()))?;
                        buf.push_str(&text);
                    }
                }
                Event::CData(data) if depth == 4 => {
                    if let Some((_, buf)) = field.as_mut() {
                        buf.push_str(&String::from_utf8_lossy(data));
                    }
                }
                _ => {}
            }

            events.push(event.into_owned());
        }

        if depth != 0 {
            return Err(malformed("unexpected end of document"));
        }
        let root = root.ok_or_else(|| malformed("no root element"))?;
        let channel_end = channel_end.ok_or_else(|| malformed("missing <channel> element"))?;

        let item_indent = item_indent.unwrap_or_else(|| {
            if closing_indent.is_empty() {
                String::new()
            } else {
                format!("{}{}", closing_indent, INDENT_UNIT)
            }
        });

        Ok(Self {
            events,
            root,
            channel_end,
            skipped,
            item_indent,
            closing_indent,
            entries,
        })
    }

    pub fn entries(&self) -> &[EntrySummary] {
        &self.entries
    }

    pub fn identifiers(&self) -> HashSet<String> {
        self.entries
            .iter()
            .filter_map(|e| e.guid.clone())
            .collect()
    }

    /// Serialize the document with `new_entries` appended to the channel
    pub fn render(&self, new_entries: &[FeedEntry]) -> FeederResult<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        let (root_start, prefix) = self.root_with_itunes()?;
        let child_indent = format!("{}{}", self.item_indent, self.indent_unit());

        write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write(&mut writer, whitespace("\n"))?;

        for (index, event) in self.events.iter().enumerate() {
            if self.skipped.contains(&index) {
                continue;
            }
            if index == self.root {
                write(&mut writer, Event::Start(root_start.borrow()))?;
                continue;
            }
            if index == self.channel_end {
                for entry in new_entries {
                    write_item(&mut writer, entry, &prefix, &self.item_indent, &child_indent)?;
                }
                write(&mut writer, whitespace(&self.closing_indent))?;
            }
            write(&mut writer, event.borrow())?;
        }

        Ok(writer.into_inner())
    }

    fn indent_unit(&self) -> &str {
        if self.item_indent.is_empty() {
            return "";
        }
        match self.item_indent.strip_prefix(self.closing_indent.as_str()) {
            Some(unit) if !unit.is_empty() && !unit.contains('\n') => unit,
            _ => INDENT_UNIT,
        }
    }

    /// The root start tag with the iTunes namespace bound, and its prefix
    fn root_with_itunes(&self) -> FeederResult<(BytesStart<'static>, String)> {
        let mut start = match &self.events[self.root] {
            Event::Start(start) => start.clone(),
            _ => return Err(malformed("root element has no children")),
        };

        let mut bound = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| malformed(e.to_string()))?;
            if let Some(prefix) = attr.key.as_ref().strip_prefix(b"xmlns:") {
                let prefix = String::from_utf8_lossy(prefix).into_owned();
                let value = attr.unescape_value().map_err(|e| malformed(e.to_string()))?;
                if value == ITUNES_NAMESPACE {
                    return Ok((start, prefix));
                }
                bound.push(prefix);
            }
        }

        let mut prefix = "itunes".to_string();
        let mut n = 1;
        while bound.contains(&prefix) {
            prefix = format!("itunes{}", n);
            n += 1;
        }

        let key = format!("xmlns:{}", prefix);
        start.push_attribute((key.as_str(), ITUNES_NAMESPACE));
        Ok((start, prefix))
    }
}

fn write_item<W: Write>(
    writer: &mut Writer<W>,
    entry: &FeedEntry,
    prefix: &str,
    indent: &str,
    child_indent: &str,
) -> FeederResult<()> {
    let length = entry.enclosure.length.to_string();
    let explicit = format!("{}:explicit", prefix);

    write(writer, whitespace(indent))?;
    write(writer, Event::Start(BytesStart::new("item")))?;

    write_text_element(writer, child_indent, BytesStart::new("title"), &entry.title)?;

    write(writer, whitespace(child_indent))?;
    write(
        writer,
        Event::Empty(BytesStart::new("enclosure").with_attributes([
            ("url", entry.enclosure.url.as_str()),
            ("length", length.as_str()),
            ("type", entry.enclosure.mime_type.as_str()),
        ])),
    )?;

    write_text_element(
        writer,
        child_indent,
        BytesStart::new("guid").with_attributes([("isPermaLink", "false")]),
        &entry.guid,
    )?;
    write_text_element(writer, child_indent, BytesStart::new("pubDate"), &entry.pub_date)?;
    write_text_element(
        writer,
        child_indent,
        BytesStart::new("description"),
        &entry.description,
    )?;
    write_text_element(
        writer,
        child_indent,
        BytesStart::new(explicit.as_str()),
        if entry.explicit { "yes" } else { "no" },
    )?;

    write(writer, whitespace(indent))?;
    write(writer, Event::End(BytesEnd::new("item")))
}

fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    indent: &str,
    start: BytesStart<'_>,
    text: &str,
) -> FeederResult<()> {
    write(writer, whitespace(indent))?;
    write(writer, Event::Start(start.borrow()))?;
    write(writer, Event::Text(BytesText::new(text)))?;
    write(writer, Event::End(start.to_end()))
}

fn write<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> FeederResult<()> {
    writer
        .write_event(event)
        .map_err(|e| FeederError::Persistence(e.to_string()))
}

fn whitespace(text: &str) -> Event<'_> {
    Event::Text(BytesText::new(text))
}

fn is_whitespace(text: &[u8]) -> bool {
    text.iter().all(u8::is_ascii_whitespace)
}

/// Whitespace text directly before the next event, if any
fn trailing_whitespace(events: &[Event<'static>]) -> String {
    match events.last() {
        Some(Event::Text(text)) if is_whitespace(text) => {
            String::from_utf8_lossy(text).into_owned()
        }
        _ => String::new(),
    }
}

fn attribute(start: &BytesStart<'_>, key: &[u8]) -> FeederResult<Option<String>> {
    let attr = start
        .try_get_attribute(key)
        .map_err(|e| malformed(e.to_string()))?;

    match attr {
        Some(attr) => {
            let value = attr.unescape_value().map_err(|e| malformed(e.to_string()))?;
            Ok(Some(value.into_owned()))
        }
        None => Ok(None),
    }
}

fn malformed(message: impl Into<String>) -> FeederError {
    FeederError::MalformedDocument(message.into())
}
