use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use scraper::Html;

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const UNTITLED: &str = "No title";

/// Entry fields as they came off the wire, before any cleaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub link: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEntry {
    pub url: String,
    pub title: String,
    pub summary: String,
    pub published_ts: i64,
    pub published_str: String,
}

impl NormalizedEntry {
    /// Title and summary joined, the text that gets scored.
    pub fn text(&self) -> String {
        if self.summary.is_empty() {
            self.title.clone()
        } else {
            format!("{} {}", self.title, self.summary)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingUrl,
    EmptyTitle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Ready(NormalizedEntry),
    Skipped(SkipReason),
}

/// Clean one entry. The summary is kept whole so scoring sees all of it;
/// callers cut it to the storage length afterwards.
pub fn normalize_entry(raw: &RawEntry, feed_url: &str) -> EntryOutcome {
    let url = match raw.link.as_deref().and_then(|href| canonical_url(href, feed_url)) {
        Some(url) => url,
        None => return EntryOutcome::Skipped(SkipReason::MissingUrl),
    };

    let title = strip_markup(raw.title.as_deref().unwrap_or(UNTITLED));
    if title.is_empty() {
        return EntryOutcome::Skipped(SkipReason::EmptyTitle);
    }

    let summary_raw = raw
        .summary
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .or(raw.content.as_deref())
        .unwrap_or_default();
    let summary = strip_markup(summary_raw);

    let (published_ts, published_str) = resolve_published(raw.published);

    EntryOutcome::Ready(NormalizedEntry {
        url,
        title,
        summary,
        published_ts,
        published_str,
    })
}

/// Plain text of an HTML fragment with whitespace collapsed. Never fails;
/// markup that yields no text becomes an empty string.
pub fn strip_markup(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(raw);
    let text = fragment
        .root_element()
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Absolute form of an entry link, resolved against the feed URL when relative.
pub fn canonical_url(href: &str, feed_url: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    url::Url::parse(feed_url)
        .and_then(|base| base.join(href))
        .map(|resolved| resolved.to_string())
        .ok()
        .or_else(|| Some(href.to_string()))
}

/// Unix seconds plus display string; a missing date becomes "now".
pub fn resolve_published(published: Option<DateTime<Utc>>) -> (i64, String) {
    let dt = published.unwrap_or_else(Utc::now);
    (dt.timestamp(), dt.format(DISPLAY_FORMAT).to_string())
}

/// Timestamp parser handed to feed-rs. Covers RFC 2822 and RFC 3339 plus the
/// looser layouts some publishers emit.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    const ZONED: &[&str] = &[
        "%a, %d %b %Y %H:%M %z",
        "%d %b %Y %H:%M:%S %z",
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%d %H:%M:%S %z",
    ];
    for format in ZONED {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    const NAIVE: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%a, %d %b %Y %H:%M:%S",
    ];
    for format in NAIVE {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(link: &str, title: &str) -> RawEntry {
        RawEntry {
            link: Some(link.to_string()),
            title: Some(title.to_string()),
            ..RawEntry::default()
        }
    }

    #[test]
    fn markup_is_stripped_and_whitespace_collapsed() {
        let html = "<p>Apple <b>beats</b>\n\n estimates</p><div>  again &amp; again</div>";
        assert_eq!(strip_markup(html), "Apple beats estimates again & again");
    }

    #[test]
    fn malformed_markup_does_not_fail() {
        assert_eq!(strip_markup("<p><b>unclosed <i>tags"), "unclosed tags");
        assert_eq!(strip_markup("<img src=x>"), "");
        assert_eq!(strip_markup(""), "");
        assert_eq!(strip_markup("Revenue < 5% of sales"), "Revenue < 5% of sales");
    }

    #[test]
    fn relative_links_resolve_against_the_feed() {
        assert_eq!(
            canonical_url("/news/1", "https://example.com/rss.xml").as_deref(),
            Some("https://example.com/news/1")
        );
        assert_eq!(
            canonical_url(" https://other.com/a ", "https://example.com/rss").as_deref(),
            Some("https://other.com/a")
        );
        assert_eq!(canonical_url("  ", "https://example.com/rss"), None);
    }

    #[test]
    fn entries_without_link_or_title_text_are_skipped() {
        let no_link = RawEntry {
            title: Some("Headline".to_string()),
            ..RawEntry::default()
        };
        assert_eq!(
            normalize_entry(&no_link, "https://example.com/rss"),
            EntryOutcome::Skipped(SkipReason::MissingUrl)
        );

        let markup_only = entry("https://example.com/a", "<img src='x.png'/>");
        assert_eq!(
            normalize_entry(&markup_only, "https://example.com/rss"),
            EntryOutcome::Skipped(SkipReason::EmptyTitle)
        );
    }

    #[test]
    fn missing_title_falls_back_to_placeholder() {
        let raw = RawEntry {
            link: Some("https://example.com/a".to_string()),
            ..RawEntry::default()
        };
        match normalize_entry(&raw, "https://example.com/rss") {
            EntryOutcome::Ready(normalized) => assert_eq!(normalized.title, "No title"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn summary_falls_back_to_content_and_stays_whole() {
        let body = "é".repeat(600);
        let raw = RawEntry {
            content: Some(format!("<p>{}</p>", body)),
            summary: Some("   ".to_string()),
            ..entry("https://example.com/a", "Title")
        };
        match normalize_entry(&raw, "https://example.com/rss") {
            EntryOutcome::Ready(normalized) => {
                assert_eq!(normalized.summary.chars().count(), 600);
                assert_eq!(normalized.text(), format!("Title {}", body));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("ééééééé", 5), "ééééé");
        assert_eq!(truncate_chars("short", 500), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn published_date_is_kept_when_present() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap();
        let (ts, display) = resolve_published(Some(dt));
        assert_eq!(ts, dt.timestamp());
        assert_eq!(display, "2024-03-01 14:30:00");
    }

    #[test]
    fn missing_date_falls_back_to_now() {
        let before = Utc::now().timestamp();
        let (ts, display) = resolve_published(None);
        let after = Utc::now().timestamp();
        assert!(ts >= before && ts <= after);
        assert_eq!(display.len(), 19);
    }

    #[test]
    fn common_feed_date_formats_parse() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap();
        for text in [
            "Fri, 01 Mar 2024 14:30:00 GMT",
            "Fri, 01 Mar 2024 09:30:00 -0500",
            "2024-03-01T14:30:00Z",
            "2024-03-01T16:30:00+02:00",
            "2024-03-01 14:30:00",
            "2024-03-01T14:30:00",
        ] {
            assert_eq!(parse_timestamp(text), Some(expected), "format: {}", text);
        }
        assert_eq!(
            parse_timestamp("2024-03-01"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("yesterday-ish"), None);
        assert_eq!(parse_timestamp(""), None);
    }
}
