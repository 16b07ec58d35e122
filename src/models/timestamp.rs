//! Timestamp assignment and the cell formats accepted when ordering rows.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;

/// Date-only format found in older rows (`DD-MM-YYYY`, local midnight)
pub const SHEET_DATE_FORMAT: &str = "%d-%m-%Y";

const NAIVE_DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Issues append timestamps that strictly increase within this process, even
/// across appends in the same millisecond or a wall clock stepped back.
#[derive(Debug)]
pub struct EventClock {
    tz: Tz,
    last_millis: AtomicI64,
}

impl EventClock {
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            last_millis: AtomicI64::new(i64::MIN),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Current time in the configured zone as RFC 3339 with millisecond precision.
    pub fn now_rfc3339(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let next = |prev: i64| now.max(prev.saturating_add(1));
        let issued = match self
            .last_millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| Some(next(prev)))
        {
            Ok(prev) | Err(prev) => next(prev),
        };
        let instant = DateTime::<Utc>::from_timestamp_millis(issued).unwrap_or_else(Utc::now);
        instant
            .with_timezone(&self.tz)
            .to_rfc3339_opts(SecondsFormat::Millis, false)
    }
}

/// Parses a stored timestamp cell for ordering purposes.
///
/// Accepted forms, tried in order: UNIX seconds (integer or fractional),
/// `DD-MM-YYYY` (midnight in `tz`), RFC 3339, and offset-less ISO date-times or
/// dates (read as UTC). A leading apostrophe, which Sheets uses to force text, is
/// ignored. Returns `None` when nothing matches.
pub fn parse_timestamp(raw: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let s = raw.trim().trim_start_matches('\'').trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(secs) = s.parse::<f64>() {
        if !secs.is_finite() {
            return None;
        }
        let whole = secs.floor();
        let nanos = ((secs - whole) * 1_000_000_000.0).round().min(999_999_999.0) as u32;
        return DateTime::<Utc>::from_timestamp(whole as i64, nanos);
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, SHEET_DATE_FORMAT) {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return tz
            .from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Sofia;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn parses_unix_seconds() {
        assert_eq!(
            parse_timestamp("1757507696", Sofia),
            Some(utc("2025-09-10T12:34:56Z"))
        );
        assert_eq!(
            parse_timestamp("1757507696.5", Sofia),
            Some(utc("2025-09-10T12:34:56.5Z"))
        );
    }

    #[test]
    fn parses_bulgarian_date_as_local_midnight() {
        // Sofia is UTC+3 in September
        assert_eq!(
            parse_timestamp("10-09-2025", Sofia),
            Some(utc("2025-09-09T21:00:00Z"))
        );
    }

    #[test]
    fn parses_iso_variants() {
        assert_eq!(
            parse_timestamp("2025-09-10T12:34:56Z", Sofia),
            Some(utc("2025-09-10T12:34:56Z"))
        );
        assert_eq!(
            parse_timestamp("2025-09-10T15:34:56.250+03:00", Sofia),
            Some(utc("2025-09-10T12:34:56.250Z"))
        );
        assert_eq!(
            parse_timestamp("2025-09-10 12:34:56", Sofia),
            Some(utc("2025-09-10T12:34:56Z"))
        );
        assert_eq!(
            parse_timestamp("2025-09-10", Sofia),
            Some(utc("2025-09-10T00:00:00Z"))
        );
    }

    #[test]
    fn ignores_leading_apostrophe_and_whitespace() {
        assert_eq!(
            parse_timestamp(" '2025-09-10T12:34:56Z ", Sofia),
            Some(utc("2025-09-10T12:34:56Z"))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_timestamp("", Sofia), None);
        assert_eq!(parse_timestamp("yesterday", Sofia), None);
        assert_eq!(parse_timestamp("NaN", Sofia), None);
        assert_eq!(parse_timestamp("31-02-2025", Sofia), None);
    }

    #[test]
    fn clock_output_round_trips_and_strictly_increases() {
        let clock = EventClock::new(Sofia);
        let mut previous = None;
        for _ in 0..50 {
            let stamp = clock.now_rfc3339();
            let parsed = parse_timestamp(&stamp, Sofia).expect("clock output parses");
            if let Some(prev) = previous {
                assert!(parsed > prev);
            }
            previous = Some(parsed);
        }
    }
}
