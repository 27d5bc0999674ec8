//! Advisory document extraction
//!
//! A per-storm advisory feed (`TCP<wallet>.xml`) carries the advisory title
//! and an item description that announces when the next bulletin is due.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::parser::patterns::{NEXT_ADVISORY, STORM_NAME};
use crate::parser::{node_text, parse_xml, time};
use crate::utils::error::ParseError;
use crate::utils::normalize_whitespace;

/// One "Next ... advisory at ..." announcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextAdvisory {
    /// Announcement text, e.g. "Next complete advisory at"
    pub message: String,
    /// Clock time text, e.g. "1100 PM"
    pub time: String,
    /// NHC timezone abbreviation, e.g. "EDT"
    pub timezone: String,
}

impl NextAdvisory {
    /// Resolve the announced time against a reference instant
    pub fn resolve(&self, reference: DateTime<Utc>) -> Result<DateTime<Tz>, ParseError> {
        time::resolve(&self.time, &self.timezone, reference)
    }
}

/// Structured content of an advisory document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryResult {
    /// Advisory title, e.g. "Hurricane Ian Public Advisory Number 20"
    pub title: String,
    /// Storm name recovered from the title (only when name updates are allowed)
    pub storm_name: Option<String>,
    /// Raw item description
    pub body: String,
    /// Announcements in document order
    pub next_advisories: Vec<NextAdvisory>,
}

impl AdvisoryResult {
    /// The authoritative announcement: the first one in document order
    pub fn next_advisory(&self) -> Option<&NextAdvisory> {
        self.next_advisories.first()
    }
}

/// Extracts [`AdvisoryResult`]s from advisory feed documents
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvisoryExtractor;

impl AdvisoryExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract title, description and next-advisory announcements
    ///
    /// A document without announcements is not an error here; the result
    /// simply has no `next_advisory()`.
    ///
    /// # Errors
    ///
    /// - `ParseError::Malformed` if the document is not well-formed XML
    /// - `ParseError::MissingField` if the title or item description is absent
    pub fn extract(
        &self,
        document: &str,
        allow_name_update: bool,
    ) -> Result<AdvisoryResult, ParseError> {
        let doc = parse_xml(document)?;

        let title = doc
            .descendants()
            .find(|n| n.has_tag_name("title"))
            .map(node_text)
            .map(|t| normalize_whitespace(&t))
            .filter(|t| !t.is_empty())
            .ok_or(ParseError::MissingField("title"))?;

        let body = doc
            .descendants()
            .find(|n| n.has_tag_name("item"))
            .and_then(|item| item.children().find(|n| n.has_tag_name("description")))
            .map(node_text)
            .filter(|t| !t.trim().is_empty())
            .ok_or(ParseError::MissingField("description"))?;

        let storm_name = if allow_name_update {
            storm_name_from_title(&title)
        } else {
            None
        };

        let next_advisories = next_advisories(&body);
        if next_advisories.is_empty() {
            tracing::debug!(title = %title, "No next-advisory announcement in description");
        }

        Ok(AdvisoryResult {
            title,
            storm_name,
            body,
            next_advisories,
        })
    }
}

/// Recover a lowercase storm name from an advisory title
pub fn storm_name_from_title(title: &str) -> Option<String> {
    STORM_NAME
        .captures(title)
        .map(|caps| caps["name"].to_lowercase())
}

/// All "Next ... advisory at ..." announcements in document order
pub fn next_advisories(description: &str) -> Vec<NextAdvisory> {
    NEXT_ADVISORY
        .captures_iter(description)
        .map(|caps| NextAdvisory {
            message: caps["message"].to_string(),
            time: caps["time"].to_string(),
            timezone: caps["tz"].to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADVISORY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Hurricane Ian Intermediate Advisory Number 20A</title>
    <item>
      <title>Hurricane Ian Intermediate Advisory Number 20A</title>
      <description><![CDATA[<pre>
...IAN MAKES LANDFALL...
Next intermediate advisory at 500 PM EDT.
Next complete advisory at 1100 PM EDT.
</pre>]]></description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_extract_full_advisory() {
        let result = AdvisoryExtractor::new().extract(ADVISORY, false).unwrap();

        assert_eq!(
            result.title,
            "Hurricane Ian Intermediate Advisory Number 20A"
        );
        assert!(result.storm_name.is_none());
        assert_eq!(result.next_advisories.len(), 2);

        let next = result.next_advisory().unwrap();
        assert_eq!(next.message, "Next intermediate advisory at");
        assert_eq!(next.time, "500 PM");
        assert_eq!(next.timezone, "EDT");
    }

    #[test]
    fn test_extract_with_name_update() {
        let result = AdvisoryExtractor::new().extract(ADVISORY, true).unwrap();
        assert_eq!(result.storm_name.as_deref(), Some("ian"));
    }

    #[test]
    fn test_storm_name_first_match_wins() {
        assert_eq!(
            storm_name_from_title("Tropical Storm Nicole Public Advisory Number 5"),
            Some("nicole".to_string())
        );
        assert_eq!(storm_name_from_title("Tropical Weather Outlook"), None);
    }

    #[test]
    fn test_missing_title() {
        let doc = "<rss><channel><item><description>Next complete advisory at 1100 PM EDT</description></item></channel></rss>";
        assert_eq!(
            AdvisoryExtractor::new().extract(doc, false),
            Err(ParseError::MissingField("title"))
        );
    }

    #[test]
    fn test_missing_description() {
        let doc = "<rss><channel><title>Hurricane Ian Public Advisory</title><item></item></channel></rss>";
        assert_eq!(
            AdvisoryExtractor::new().extract(doc, false),
            Err(ParseError::MissingField("description"))
        );
    }

    #[test]
    fn test_no_announcement_is_soft() {
        let doc = "<rss><channel><title>Post-Tropical Cyclone Ian Public Advisory</title><item><description>This is the last public advisory.</description></item></channel></rss>";
        let result = AdvisoryExtractor::new().extract(doc, false).unwrap();
        assert!(result.next_advisory().is_none());
    }

    #[test]
    fn test_wrapped_title_is_collapsed() {
        let doc = "<rss><channel><title>Hurricane Ian\n    Public Advisory Number 21</title><item><description>Next complete advisory at 500 AM EDT.</description></item></channel></rss>";
        let result = AdvisoryExtractor::new().extract(doc, true).unwrap();
        assert_eq!(result.title, "Hurricane Ian Public Advisory Number 21");
        assert_eq!(result.storm_name.as_deref(), Some("ian"));
    }

    #[test]
    fn test_malformed_document() {
        let result = AdvisoryExtractor::new().extract("<rss><channel>", false);
        assert!(matches!(result, Err(ParseError::Malformed(_))));
    }
}
