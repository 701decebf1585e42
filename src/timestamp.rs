//! Timestamp handling for export records.
//!
//! Exports are inconsistent about time: some records carry Unix epochs as JSON
//! numbers (seconds, occasionally milliseconds), others carry date strings with
//! or without an offset. Everything is normalised to a [`Moment`] which can then
//! be projected onto a wall clock in any time zone.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Epoch values above this are read as milliseconds rather than seconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A timestamp exactly as it appeared in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Integer(i64),
    Float(f64),
    Text(String),
    Other(serde_json::Value),
}

/// A parsed point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Moment {
    /// A real instant (epoch or a string with an offset).
    Absolute(DateTime<Utc>),
    /// A wall-clock reading with no zone attached; it is taken as-is in every zone.
    Floating(NaiveDateTime),
}

impl Moment {
    pub fn wall_clock_in<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDateTime {
        match self {
            Moment::Absolute(dt) => dt.with_timezone(tz).naive_local(),
            Moment::Floating(naive) => *naive,
        }
    }

    pub fn date_in<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        self.wall_clock_in(tz).date()
    }
}

impl RawTimestamp {
    pub fn parse(&self) -> Option<Moment> {
        match self {
            RawTimestamp::Integer(v) => from_epoch(*v).map(Moment::Absolute),
            RawTimestamp::Float(v) if v.is_finite() => {
                let millis = if v.abs() > MILLIS_THRESHOLD as f64 { *v } else { v * 1000.0 };
                // `as` saturates, and out-of-range millis come back as None
                DateTime::from_timestamp_millis(millis as i64).map(Moment::Absolute)
            }
            RawTimestamp::Float(_) => None,
            RawTimestamp::Text(s) => parse_text(s),
            RawTimestamp::Other(_) => None,
        }
    }
}

pub fn parse_text(raw: &str) -> Option<Moment> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse::<i64>().ok().and_then(from_epoch).map(Moment::Absolute);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(Moment::Absolute(dt.with_timezone(&Utc)));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Moment::Floating(naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(Moment::Floating)
}

fn from_epoch(v: i64) -> Option<DateTime<Utc>> {
    if v.unsigned_abs() > MILLIS_THRESHOLD as u64 {
        DateTime::from_timestamp_millis(v)
    } else {
        DateTime::from_timestamp(v, 0)
    }
}

/// `January 5, 2020`
pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn epoch_seconds_and_millis_agree() {
        let secs = RawTimestamp::Integer(1_600_000_000).parse().unwrap();
        let millis = RawTimestamp::Integer(1_600_000_000_000).parse().unwrap();
        let text = RawTimestamp::Text("1600000000".into()).parse().unwrap();
        assert_eq!(secs, millis);
        assert_eq!(secs, text);
        assert_eq!(secs.date_in(&Utc), ymd(2020, 9, 13));
    }

    #[test]
    fn offset_strings_follow_the_zone() {
        let m = parse_text("2024-03-01T23:30:00Z").unwrap();
        assert_eq!(m.date_in(&Utc), ymd(2024, 3, 1));
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(m.date_in(&plus_two), ymd(2024, 3, 2));
    }

    #[test]
    fn naive_strings_float() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        for s in ["2024-03-01 23:30:00", "2024-03-01T23:30:00.250", "2024-03-01"] {
            let m = parse_text(s).unwrap();
            assert!(matches!(m, Moment::Floating(_)), "{s}");
            assert_eq!(m.date_in(&plus_two), ymd(2024, 3, 1), "{s}");
        }
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_text(""), None);
        assert_eq!(parse_text("yesterday"), None);
        assert_eq!(RawTimestamp::Float(f64::NAN).parse(), None);
        assert_eq!(RawTimestamp::Other(serde_json::json!({"at": 1})).parse(), None);
    }

    #[test]
    fn extreme_epochs_are_none() {
        assert_eq!(RawTimestamp::Integer(i64::MIN).parse(), None);
        assert_eq!(RawTimestamp::Integer(i64::MAX).parse(), None);
        assert_eq!(RawTimestamp::Float(-1e300).parse(), None);
        assert_eq!(RawTimestamp::Float(1e300).parse(), None);
        assert_eq!(parse_text("-9223372036854775808"), None);
    }

    #[test]
    fn raw_timestamps_deserialize_from_any_json() {
        let raw: Vec<RawTimestamp> = serde_json::from_str(r#"[1, 2.5, "x", true]"#).unwrap();
        assert_eq!(raw[0], RawTimestamp::Integer(1));
        assert_eq!(raw[1], RawTimestamp::Float(2.5));
        assert_eq!(raw[2], RawTimestamp::Text("x".into()));
        assert!(matches!(raw[3], RawTimestamp::Other(_)));
    }

    #[test]
    fn long_date_has_no_padding() {
        assert_eq!(format_long_date(ymd(2020, 1, 5)), "January 5, 2020");
    }
}
