//! Named grammar rules for NHC free text
//!
//! Advisory titles, "next advisory" phrases and graphic links are pulled out
//! of free text. Each rule lives here under a name so the extractors read as
//! rule applications rather than ad hoc pattern strings.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::Selector;

// Compile-time literals; a failure here is a programming error.
macro_rules! parse_pattern {
    ($s:expr) => {
        Regex::new($s).expect(concat!("Invalid pattern: ", $s))
    };
}

macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

lazy_static! {
    /// `Next <adjective> advisory at <time> <TZ>`, e.g.
    /// "Next intermediate advisory at 200 PM EDT"
    pub static ref NEXT_ADVISORY: Regex =
        parse_pattern!(r"(?P<message>Next \w+ advisory at) (?P<time>\d+ \w+) (?P<tz>\w+)");

    /// `<name> Intermediate|Public` inside an advisory title
    pub static ref STORM_NAME: Regex =
        parse_pattern!(r"(?i)(?P<name>\w+) (?:Intermediate|Public)");

    /// 12-hour clock text without a date, e.g. "1100 PM" or "500 am"
    pub static ref CLOCK_TIME: Regex =
        parse_pattern!(r"^(?P<digits>\d{3,4})\s*(?P<meridiem>[AaPp][Mm])$");

    /// First `.png` link in raw text (fallback when markup is not parseable)
    pub static ref PNG_LINK: Regex =
        parse_pattern!(r#"(?:https?:)?//[^\s"'<>]+?\.png"#);

    /// Elements that can carry a graphic link inside an item description
    pub static ref LINK_ELEMENTS: Selector = parse_selector!("img[src], a[href]");
}

/// Filename suffix NHC uses for thumbnail-size graphics
pub const SMALL_IMAGE_SUFFIX: &str = "_sm2";
