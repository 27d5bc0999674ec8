//! Basin-wide tropical cyclone feed
//!
//! The basin feed (`index-at.xml`, `index-ep.xml`, ...) lists active storms as
//! `nhc:Cyclone` elements and carries a flat list of RSS items, some of which
//! are "<Type> <Name> Graphics" entries with links to the forecast cone.

use scraper::Html;
use serde::{Deserialize, Serialize};

use crate::parser::patterns::{LINK_ELEMENTS, PNG_LINK, SMALL_IMAGE_SUFFIX};
use crate::parser::{node_text, parse_xml};
use crate::utils::error::ParseError;
use crate::utils::normalize_whitespace;

/// XML namespace of the NHC cyclone extension elements
pub const NHC_NAMESPACE: &str = "https://www.nhc.noaa.gov";

/// One `nhc:Cyclone` element; every field may be absent in the wild
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycloneEntry {
    pub atcf: Option<String>,
    pub name: Option<String>,
    /// `nhc:type`, e.g. "Hurricane" or "Tropical Storm"
    pub strength: Option<String>,
    /// `nhc:wallet`, e.g. "AT4"
    pub wallet: Option<String>,
}

/// One syndication item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    pub description: String,
}

/// Parsed basin feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasinFeed {
    pub cyclones: Vec<CycloneEntry>,
    pub items: Vec<FeedItem>,
}

impl BasinFeed {
    /// Parse a basin feed document
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Malformed` if the document is not well-formed XML
    pub fn parse(xml: &str) -> Result<Self, ParseError> {
        let doc = parse_xml(xml)?;

        let cyclones = doc
            .descendants()
            .filter(|n| n.has_tag_name((NHC_NAMESPACE, "Cyclone")))
            .map(|cyclone| {
                let field = |name: &str| {
                    cyclone
                        .children()
                        .find(|n| n.has_tag_name((NHC_NAMESPACE, name)))
                        .map(node_text)
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                };

                CycloneEntry {
                    atcf: field("atcf"),
                    name: field("name"),
                    strength: field("type"),
                    wallet: field("wallet"),
                }
            })
            .collect();

        let items = doc
            .descendants()
            .filter(|n| n.has_tag_name("item"))
            .filter_map(|item| {
                let title = item
                    .children()
                    .find(|n| n.has_tag_name("title"))
                    .map(node_text)?;
                let description = item
                    .children()
                    .find(|n| n.has_tag_name("description"))
                    .map(node_text)
                    .unwrap_or_default();

                Some(FeedItem {
                    title: normalize_whitespace(&title),
                    description,
                })
            })
            .collect();

        Ok(Self { cyclones, items })
    }

    /// Whether the feed lists no active cyclones
    pub fn is_empty(&self) -> bool {
        self.cyclones.is_empty()
    }

    /// First item whose title contains "<strength> <name> Graphics"
    pub fn find_graphics_item(&self, strength: &str, name: &str) -> Option<&FeedItem> {
        let wanted = format!("{strength} {name} Graphics").to_lowercase();

        self.items
            .iter()
            .find(|item| item.title.to_lowercase().contains(&wanted))
    }
}

/// First `.png` link in an item description, normalized to full resolution
pub fn extract_image_link(description: &str) -> Option<String> {
    let fragment = Html::parse_fragment(description);

    let from_markup = fragment.select(&LINK_ELEMENTS).find_map(|element| {
        let value = element.value();
        value
            .attr("src")
            .or_else(|| value.attr("href"))
            .filter(|link| link.to_lowercase().ends_with(".png"))
            .map(str::to_string)
    });

    from_markup
        .or_else(|| PNG_LINK.find(description).map(|m| m.as_str().to_string()))
        .map(|link| full_resolution(&link))
}

/// Strip the thumbnail suffix and give protocol-relative links a scheme
pub fn full_resolution(link: &str) -> String {
    let link = link.replace(SMALL_IMAGE_SUFFIX, "");

    if link.starts_with("//") {
        format!("https:{link}")
    } else {
        link
    }
}
