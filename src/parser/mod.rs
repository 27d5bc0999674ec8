//! NHC document parsing
//!
//! This module turns fetched feed documents into structured data:
//!
//! - [`basin`] - basin-wide feed: active cyclones and graphic items
//! - [`advisory`] - per-storm advisory feed: title and next-advisory time
//! - [`time`] - date reconstruction for day-less advisory clock times
//! - [`patterns`] - the named free-text grammar rules shared by the above

pub mod advisory;
pub mod basin;
pub mod patterns;
pub mod time;

pub use advisory::{AdvisoryExtractor, AdvisoryResult, NextAdvisory};
pub use basin::{extract_image_link, BasinFeed, CycloneEntry, FeedItem};
pub use time::{lookup_timezone, resolve, NHC_TIMEZONES};

use crate::utils::error::ParseError;

/// Parse an XML document, mapping syntax errors to `ParseError::Malformed`
pub(crate) fn parse_xml(xml: &str) -> Result<roxmltree::Document<'_>, ParseError> {
    roxmltree::Document::parse(xml.trim_start_matches('\u{feff}'))
        .map_err(|e| ParseError::malformed(e.to_string()))
}

/// All text beneath a node, CDATA included
pub(crate) fn node_text(node: roxmltree::Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}
