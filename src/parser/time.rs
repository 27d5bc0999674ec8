//! Advisory time resolution
//!
//! NHC advisories announce the next bulletin as a bare 12-hour clock time
//! plus a timezone abbreviation ("Next advisory at 1100 PM EDT"). There is no
//! date, so the date is reconstructed from a reference instant.
//!
//! The reconstruction assumes the next advisory is less than 24 hours after
//! the reference instant and compares hours only: an advisory hour earlier
//! than the reference hour is moved to the following day. Advisories more
//! than a day out, or earlier in the same hour as the reference, resolve to
//! the wrong instant; the scheduler rejects the latter as a non-positive
//! interval.

use chrono::{DateTime, LocalResult, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::parser::patterns::CLOCK_TIME;
use crate::utils::error::ParseError;

/// NHC timezone abbreviations mapped to geographic zones
pub const NHC_TIMEZONES: &[(&str, Tz)] = &[
    ("HI", Tz::Pacific__Honolulu),
    ("AK", Tz::America__Anchorage),
    ("PST", Tz::America__Los_Angeles),
    ("PDT", Tz::America__Los_Angeles),
    ("MST", Tz::America__Denver),
    ("MDT", Tz::America__Denver),
    ("CST", Tz::America__Chicago),
    ("CDT", Tz::America__Chicago),
    ("EST", Tz::America__New_York),
    ("EDT", Tz::America__New_York),
    ("AST", Tz::America__Puerto_Rico),
    ("GUAM", Tz::Pacific__Guam),
    ("CVT", Tz::Atlantic__Cape_Verde),
];

/// Map an NHC timezone abbreviation to its geographic zone (case-insensitive)
///
/// # Errors
///
/// Returns `ParseError::UnknownTimezone` for abbreviations outside the table
pub fn lookup_timezone(abbrev: &str) -> Result<Tz, ParseError> {
    let wanted = abbrev.trim();

    NHC_TIMEZONES
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(wanted))
        .map(|(_, tz)| *tz)
        .ok_or_else(|| ParseError::UnknownTimezone(wanted.to_string()))
}

/// Parse "HMM AM" / "HHMM PM" into a 24-hour wall-clock time
///
/// # Errors
///
/// Returns `ParseError::InvalidTime` if the text is not a 3-4 digit
/// 12-hour clock time with an AM/PM designator
pub fn parse_clock_time(text: &str) -> Result<NaiveTime, ParseError> {
    let trimmed = text.trim();
    let caps = CLOCK_TIME
        .captures(trimmed)
        .ok_or_else(|| ParseError::invalid_time(trimmed))?;

    let digits = &caps["digits"];
    let (hour_text, minute_text) = digits.split_at(digits.len() - 2);
    let hour: u32 = hour_text
        .parse()
        .map_err(|_| ParseError::invalid_time(trimmed))?;
    let minute: u32 = minute_text
        .parse()
        .map_err(|_| ParseError::invalid_time(trimmed))?;

    if !(1..=12).contains(&hour) || minute > 59 {
        return Err(ParseError::invalid_time(trimmed));
    }

    let is_pm = caps["meridiem"].eq_ignore_ascii_case("pm");
    let hour24 = match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };

    NaiveTime::from_hms_opt(hour24, minute, 0).ok_or_else(|| ParseError::invalid_time(trimmed))
}

/// Resolve advisory clock text into an absolute, zone-carrying instant
///
/// The date is the reference instant's calendar day in the advisory zone,
/// advanced by one day when the advisory hour is earlier than the reference
/// hour. Ambiguous local times (DST fall-back) take the earlier instant.
///
/// # Errors
///
/// - `ParseError::UnknownTimezone` if `tz_abbrev` is not an NHC abbreviation
/// - `ParseError::InvalidTime` if the text is malformed or names a local time
///   skipped by a DST transition
pub fn resolve(
    time_text: &str,
    tz_abbrev: &str,
    reference: DateTime<Utc>,
) -> Result<DateTime<Tz>, ParseError> {
    let tz = lookup_timezone(tz_abbrev)?;
    let clock = parse_clock_time(time_text)?;

    let local_reference = reference.with_timezone(&tz);
    let mut date = local_reference.date_naive();
    if clock.hour() < local_reference.hour() {
        date = date
            .succ_opt()
            .ok_or_else(|| ParseError::invalid_time(time_text.trim()))?;
    }

    match tz.from_local_datetime(&date.and_time(clock)) {
        LocalResult::Single(instant) => Ok(instant),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => Err(ParseError::invalid_time(format!(
            "{} {} does not exist on {date}",
            time_text.trim(),
            tz_abbrev.trim()
        ))),
    }
}
