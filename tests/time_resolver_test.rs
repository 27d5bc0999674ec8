//! Property tests for advisory time resolution

use chrono::{DateTime, Timelike, Utc};
use proptest::prelude::*;
use stormwatch::parser::{lookup_timezone, resolve, NHC_TIMEZONES};
use stormwatch::utils::error::ParseError;

fn reference_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    // 2020-01-01 .. 2030-01-01
    (1_577_836_800i64..1_893_456_000i64)
        .prop_map(|secs| DateTime::from_timestamp(secs, 0).unwrap())
}

fn clock_strategy() -> impl Strategy<Value = (u32, u32, bool)> {
    (1u32..=12, 0u32..60, any::<bool>())
}

fn clock_text(hour: u32, minute: u32, pm: bool) -> String {
    format!("{hour}{minute:02} {}", if pm { "PM" } else { "AM" })
}

fn hour24(hour: u32, pm: bool) -> u32 {
    match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    }
}

proptest! {
    #[test]
    fn resolved_time_keeps_wall_clock(
        reference in reference_strategy(),
        (hour, minute, pm) in clock_strategy(),
        zone in 0usize..NHC_TIMEZONES.len(),
    ) {
        let (abbrev, tz) = NHC_TIMEZONES[zone];
        let text = clock_text(hour, minute, pm);

        // Local times skipped by a DST jump are reported, never invented
        let Ok(resolved) = resolve(&text, abbrev, reference) else {
            return Ok(());
        };

        let local = resolved.with_timezone(&tz);
        prop_assert_eq!(local.hour(), hour24(hour, pm));
        prop_assert_eq!(local.minute(), minute);
    }

    #[test]
    fn resolved_date_rolls_over_only_for_earlier_hours(
        reference in reference_strategy(),
        (hour, minute, pm) in clock_strategy(),
        zone in 0usize..NHC_TIMEZONES.len(),
    ) {
        let (abbrev, tz) = NHC_TIMEZONES[zone];
        let Ok(resolved) = resolve(&clock_text(hour, minute, pm), abbrev, reference) else {
            return Ok(());
        };

        let local_reference = reference.with_timezone(&tz);
        let days = (resolved.date_naive() - local_reference.date_naive()).num_days();

        if hour24(hour, pm) < local_reference.hour() {
            prop_assert_eq!(days, 1);
        } else {
            prop_assert_eq!(days, 0);
        }
    }

    #[test]
    fn later_hours_resolve_into_the_future(
        reference in reference_strategy(),
        (hour, minute, pm) in clock_strategy(),
    ) {
        let tz = lookup_timezone("EDT").unwrap();
        let local_reference = reference.with_timezone(&tz);
        prop_assume!(hour24(hour, pm) > local_reference.hour());

        if let Ok(resolved) = resolve(&clock_text(hour, minute, pm), "EDT", reference) {
            prop_assert!(resolved.with_timezone(&Utc) > reference);
        }
    }

    #[test]
    fn unknown_zones_are_rejected(
        reference in reference_strategy(),
        abbrev in "[A-Z]{4,6}",
    ) {
        prop_assume!(lookup_timezone(&abbrev).is_err());
        prop_assert_eq!(
            resolve("1100 PM", &abbrev, reference),
            Err(ParseError::UnknownTimezone(abbrev.clone()))
        );
    }
}

#[test]
fn test_every_nhc_abbreviation_resolves() {
    let reference = DateTime::from_timestamp(1_664_301_600, 0).unwrap();
    for (abbrev, _) in NHC_TIMEZONES {
        assert!(
            resolve("1100 AM", abbrev, reference).is_ok(),
            "{abbrev} did not resolve"
        );
    }
}
