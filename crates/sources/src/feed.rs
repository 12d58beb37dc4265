use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// One `<item>` (RSS) or `<entry>` (Atom) parsed out of a feed document.
/// Minimal by design — just what the article source needs to build an
/// `Article`.
#[derive(Debug, Default, Clone)]
pub struct FeedEntry {
    pub title: String,
    pub link: Option<String>,
    pub summary: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// Parses RSS 2.0 `<item>` and Atom `<entry>` elements out of `xml`,
/// tolerating whichever dialect is present. Malformed XML yields whatever
/// entries were parsed before the error, never a hard failure — feed
/// quality in the wild varies too much to be strict here.
pub fn parse_feed(xml: &str) -> Vec<FeedEntry> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut buf = Vec::new();
    let mut in_item = false;
    let mut current_tag = String::new();
    let mut cur = FeedEntry::default();
    let mut raw_date: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = local_name(e);
                if name == "item" || name == "entry" {
                    in_item = true;
                    cur = FeedEntry::default();
                    raw_date = None;
                } else if in_item {
                    current_tag = name.clone();
                    if name == "link" {
                        if let Some(href) = attr(e, "href") {
                            cur.link = Some(href);
                        }
                    }
                }
            }
            Ok(Event::Empty(ref e)) => {
                let name = local_name(e);
                if in_item && name == "link" {
                    if let Some(href) = attr(e, "href") {
                        cur.link = Some(href);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if in_item {
                    let text = t.unescape().unwrap_or_default().into_owned();
                    match current_tag.as_str() {
                        "title" => cur.title = text,
                        "link" if cur.link.is_none() => cur.link = Some(text),
                        "description" | "summary" => cur.summary = text,
                        "pubdate" | "published" | "updated" => raw_date = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                let name = local_name(e);
                if name == "item" || name == "entry" {
                    cur.published_at = raw_date.as_deref().and_then(parse_feed_date);
                    entries.push(std::mem::take(&mut cur));
                    in_item = false;
                } else if in_item {
                    current_tag.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    entries
}

fn local_name(e: &BytesStart) -> String {
    let name = e.name();
    let full = String::from_utf8_lossy(name.as_ref());
    full.rsplit(':').next().unwrap_or(&full).to_lowercase()
}

fn attr(e: &BytesStart, key: &str) -> Option<String> {
    e.attributes().filter_map(|a| a.ok()).find_map(|a| {
        if a.key.as_ref() == key.as_bytes() {
            Some(String::from_utf8_lossy(&a.value).into_owned())
        } else {
            None
        }
    })
}

/// Feeds mix RFC 2822 (`pubDate`) and RFC 3339 (`published`/`updated`)
/// timestamps; try both.
fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw.trim()) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw.trim()) {
        return Some(dt.with_timezone(&Utc));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rss_items() {
        let xml = r#"
        <rss><channel>
          <item>
            <title>Acme raises $50M</title>
            <link>https://example.com/a</link>
            <description>Funding news</description>
            <pubDate>Tue, 01 Jul 2025 12:00:00 GMT</pubDate>
          </item>
        </channel></rss>
        "#;
        let entries = parse_feed(xml);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Acme raises $50M");
        assert_eq!(entries[0].link.as_deref(), Some("https://example.com/a"));
        assert!(entries[0].published_at.is_some());
    }

    #[test]
    fn parses_atom_entries_with_href_link() {
        let xml = r#"
        <feed>
          <entry>
            <title>Beta closes Series A</title>
            <link href="https://example.com/b"/>
            <summary>More funding news</summary>
            <updated>2025-07-01T12:00:00Z</updated>
          </entry>
        </feed>
        "#;
        let entries = parse_feed(xml);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link.as_deref(), Some("https://example.com/b"));
        assert!(entries[0].published_at.is_some());
    }

    #[test]
    fn malformed_xml_yields_partial_results_not_a_panic() {
        let xml = "<rss><channel><item><title>Unterminated";
        let entries = parse_feed(xml);
        assert!(entries.is_empty() || entries.len() <= 1);
    }
}
