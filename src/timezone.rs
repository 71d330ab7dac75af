// src/timezone.rs
//! Moscow wall-clock time (fixed UTC+3, no DST) and the date formats users type.
//!
//! Deadlines are stored as naive UTC values; everything a user sees or types is
//! Moscow time.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDateTime, TimeZone, Utc};

use crate::error::{Result, TrackerError};

/// Offset of Moscow time from UTC, in seconds
pub const MOSCOW_OFFSET_SECS: i32 = 3 * 3600;

/// Rendered in place of a missing timestamp
pub const NOT_SET: &str = "not set";

const FULL_FORMAT: &str = "%d.%m.%Y %H:%M";
const SHORT_FORMAT: &str = "%d.%m %H:%M";

pub fn moscow() -> FixedOffset {
    FixedOffset::east_opt(MOSCOW_OFFSET_SECS).expect("UTC+3 is a valid offset")
}

/// Current time in Moscow
pub fn now_local() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&moscow())
}

/// Anything that can be shown in Moscow time or written to storage.
///
/// Naive values are ambiguous, so the two directions interpret them
/// differently: `to_moscow` treats a naive value as UTC (what the database
/// holds), `to_stored_utc` treats it as Moscow wall-clock (what a user typed).
pub trait Timestamp {
    fn to_moscow(&self) -> DateTime<FixedOffset>;
    fn to_stored_utc(&self) -> NaiveDateTime;
}

impl Timestamp for NaiveDateTime {
    fn to_moscow(&self) -> DateTime<FixedOffset> {
        Utc.from_utc_datetime(self).with_timezone(&moscow())
    }

    fn to_stored_utc(&self) -> NaiveDateTime {
        *self - Duration::seconds(i64::from(MOSCOW_OFFSET_SECS))
    }
}

impl<Tz: TimeZone> Timestamp for DateTime<Tz> {
    fn to_moscow(&self) -> DateTime<FixedOffset> {
        self.with_timezone(&moscow())
    }

    fn to_stored_utc(&self) -> NaiveDateTime {
        self.naive_utc()
    }
}

pub fn to_local<T: Timestamp>(ts: Option<T>) -> Option<DateTime<FixedOffset>> {
    ts.map(|t| t.to_moscow())
}

pub fn to_utc<T: Timestamp>(ts: Option<T>) -> Option<NaiveDateTime> {
    ts.map(|t| t.to_stored_utc())
}

/// Render as `DD.MM HH:MM` or `DD.MM.YYYY HH:MM` in Moscow time
pub fn format_datetime<T: Timestamp>(ts: Option<T>, with_year: bool) -> String {
    match ts {
        None => NOT_SET.to_string(),
        Some(ts) => {
            let local = ts.to_moscow();
            if with_year {
                local.format(FULL_FORMAT).to_string()
            } else {
                local.format(SHORT_FORMAT).to_string()
            }
        }
    }
}

/// Parse `DD.MM.YYYY HH:MM` or `DD.MM HH:MM` (Moscow time) into a stored UTC value
pub fn parse_datetime(text: &str) -> Result<NaiveDateTime> {
    parse_datetime_at(text, now_local())
}

/// Same as [`parse_datetime`], with an explicit "now" for the year-less form.
///
/// A year-less date takes the current year, or the next one if that moment
/// has already passed.
pub fn parse_datetime_at(text: &str, now: DateTime<FixedOffset>) -> Result<NaiveDateTime> {
    let text = text.trim();
    let invalid = || TrackerError::InvalidDate(text.to_string());

    if let Ok(naive) = NaiveDateTime::parse_from_str(text, FULL_FORMAT) {
        return Ok(naive.to_stored_utc());
    }

    // chrono cannot parse a date without a year, so splice one in
    let (date_part, time_part) = text.split_once(' ').ok_or_else(invalid)?;
    if date_part.matches('.').count() != 1 {
        return Err(invalid());
    }

    let now_local = now.to_moscow();
    for year in [now_local.year(), now_local.year() + 1] {
        let candidate = format!("{date_part}.{year} {}", time_part.trim());
        let Ok(naive) = NaiveDateTime::parse_from_str(&candidate, FULL_FORMAT) else {
            continue;
        };
        let Some(local) = moscow().from_local_datetime(&naive).single() else {
            continue;
        };
        if local >= now_local {
            return Ok(local.naive_utc());
        }
    }

    Err(invalid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use proptest::prelude::*;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        moscow().with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_now_local_offset() {
        let now = now_local();
        assert_eq!(now.offset().local_minus_utc(), MOSCOW_OFFSET_SECS);
    }

    #[test]
    fn test_naive_is_utc_when_displayed() {
        let stored = naive(2026, 3, 1, 6, 0);
        let shown = stored.to_moscow();
        assert_eq!(shown.hour(), 9);
        assert_eq!(to_local::<NaiveDateTime>(None), None);
    }

    #[test]
    fn test_naive_is_local_when_stored() {
        let typed = naive(2026, 3, 1, 9, 0);
        assert_eq!(to_utc(Some(typed)), Some(naive(2026, 3, 1, 6, 0)));

        let aware = local(2026, 3, 1, 9, 0);
        assert_eq!(aware.to_stored_utc(), naive(2026, 3, 1, 6, 0));
    }

    #[test]
    fn test_format_datetime() {
        let stored = naive(2026, 12, 31, 22, 15);
        assert_eq!(format_datetime(Some(stored), true), "01.01.2027 01:15");
        assert_eq!(format_datetime(Some(stored), false), "01.01 01:15");
        assert_eq!(format_datetime::<NaiveDateTime>(None, true), NOT_SET);
    }

    #[test]
    fn test_full_format_round_trips() {
        for text in ["05.03.2027 14:30", "01.01.2026 00:00", "31.12.2030 23:59"] {
            let stored = parse_datetime(text).unwrap();
            assert_eq!(format_datetime(Some(stored), true), text);
        }
    }

    #[test]
    fn test_short_format_uses_current_year() {
        let now = local(2026, 3, 10, 12, 0);
        let stored = parse_datetime_at("20.05 10:00", now).unwrap();
        assert_eq!(stored, naive(2026, 5, 20, 7, 0));
    }

    #[test]
    fn test_short_format_rolls_to_next_year() {
        let now = local(2026, 3, 10, 12, 0);
        let stored = parse_datetime_at("01.02 10:00", now).unwrap();
        assert_eq!(stored, naive(2027, 2, 1, 7, 0));
        assert!(stored.to_moscow() >= now);

        // earlier today has already passed
        let stored = parse_datetime_at("10.03 11:59", now).unwrap();
        assert_eq!(stored.to_moscow().year(), 2027);
    }

    #[test]
    fn test_short_format_leap_day() {
        let now = local(2027, 3, 1, 0, 0);
        let stored = parse_datetime_at("29.02 10:00", now).unwrap();
        assert_eq!(stored.to_moscow().year(), 2028);
    }

    #[test]
    fn test_rejects_other_shapes() {
        let now = local(2026, 3, 10, 12, 0);
        for text in ["", "tomorrow", "2026-05-20 10:00", "20.05", "20.05.2026", "32.01 10:00", "20.05 25:00"] {
            let err = parse_datetime_at(text, now).unwrap_err();
            assert!(matches!(err, TrackerError::InvalidDate(_)), "{text}");
        }
    }

    #[test]
    fn test_short_format_around_new_year() {
        let now = local(2026, 12, 31, 23, 59);
        assert_eq!(parse_datetime_at("31.12 23:59", now).unwrap().to_moscow(), now);
        let stored = parse_datetime_at("31.12 23:58", now).unwrap();
        assert_eq!(stored.to_moscow(), local(2027, 12, 31, 23, 58));
        let stored = parse_datetime_at("01.01 00:00", now).unwrap();
        assert_eq!(stored.to_moscow(), local(2027, 1, 1, 0, 0));

        // leap day inside a leap year, before and after it passes
        let now = local(2028, 1, 15, 12, 0);
        assert_eq!(parse_datetime_at("29.02 08:00", now).unwrap().to_moscow(), local(2028, 2, 29, 8, 0));
        let now = local(2028, 3, 1, 0, 0);
        assert!(parse_datetime_at("29.02 08:00", now).is_err());
    }

    fn arb_local() -> impl Strategy<Value = DateTime<FixedOffset>> {
        // 2000-01-01 .. 2099-12-31, minute resolution
        (0i64..36_524, 0u32..24, 0u32..60).prop_map(|(day, h, m)| {
            let date = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap() + Duration::days(day);
            moscow()
                .from_local_datetime(&date.and_hms_opt(h, m, 0).unwrap())
                .unwrap()
        })
    }

    proptest! {
        #[test]
        fn prop_full_format_round_trips(at in arb_local()) {
            let text = at.format("%d.%m.%Y %H:%M").to_string();
            let stored = parse_datetime(&text).unwrap();
            prop_assert_eq!(stored, at.naive_utc());
            prop_assert_eq!(format_datetime(Some(stored), true), text);
        }

        #[test]
        fn prop_short_format_never_in_the_past(now in arb_local(), target in arb_local()) {
            let text = target.format("%d.%m %H:%M").to_string();
            match parse_datetime_at(&text, now) {
                Ok(stored) => {
                    let local = stored.to_moscow();
                    prop_assert!(local >= now);
                    prop_assert!(local.year() == now.year() || local.year() == now.year() + 1);
                    prop_assert_eq!(local.format("%d.%m %H:%M").to_string(), text);
                }
                // only a leap day can be missing from both candidate years
                Err(_) => prop_assert_eq!((target.day(), target.month()), (29, 2)),
            }
        }
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let stored = parse_datetime("  05.03.2027 14:30 \n").unwrap();
        assert_eq!(stored, naive(2027, 3, 5, 11, 30));
    }
}
