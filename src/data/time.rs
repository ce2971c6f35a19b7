use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};

use super::table::Value;

/// Offset-carrying layouts tried after RFC 3339.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Layouts without an offset; interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
];

/// Parse one timestamp cell. Formats may differ from row to row.
///
/// Bare numbers are Unix epoch seconds. A column holding epoch milliseconds
/// or nanoseconds is not detected and will be read as seconds, landing far
/// in the future.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.and_utc());
        }
    }
    raw.parse::<f64>().ok().and_then(from_epoch_seconds)
}

/// Timestamp from an already-typed table cell. Integer and float cells are
/// epoch seconds, with the same caveat as [`parse_timestamp`].
pub fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Integer(i) => DateTime::from_timestamp(*i, 0),
        Value::Float(f) => from_epoch_seconds(*f),
        Value::String(s) => parse_timestamp(s),
        Value::Bool(_) | Value::Null => None,
    }
}

fn from_epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

/// Elapsed seconds from `start` to `t` (negative if `t` is earlier).
pub fn seconds_since(start: DateTime<Utc>, t: DateTime<Utc>) -> f64 {
    delta_seconds(t - start)
}

fn delta_seconds(delta: TimeDelta) -> f64 {
    match delta.num_nanoseconds() {
        Some(ns) => ns as f64 / 1e9,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64, nanos: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, nanos).unwrap()
    }

    #[test]
    fn test_parse_rfc3339() {
        let t = parse_timestamp("2024-03-01T10:00:00.250Z").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap() + TimeDelta::milliseconds(250));
    }

    #[test]
    fn test_parse_space_separated_with_offset() {
        let t = parse_timestamp("2024-03-01 12:00:00+02:00").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_as_utc() {
        let t = parse_timestamp("2024-03-01 10:00:00.5").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap() + TimeDelta::milliseconds(500));
        assert!(parse_timestamp("2024/03/01 10:00:00").is_some());
    }

    #[test]
    fn test_parse_epoch_seconds() {
        assert_eq!(parse_timestamp("1700000000.5"), Some(at(1_700_000_000, 500_000_000)));
        assert_eq!(timestamp_from_value(&Value::Integer(8)), Some(at(8, 0)));
        assert_eq!(timestamp_from_value(&Value::Float(2.25)), Some(at(2, 250_000_000)));
    }

    #[test]
    fn test_epoch_milliseconds_read_as_seconds() {
        let ms = 1_700_000_000_000;
        assert_eq!(timestamp_from_value(&Value::Integer(ms)), Some(at(ms, 0)));
        assert_eq!(parse_timestamp("1700000000000"), Some(at(ms, 0)));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(timestamp_from_value(&Value::Null), None);
        assert_eq!(timestamp_from_value(&Value::Float(f64::NAN)), None);
    }

    #[test]
    fn test_seconds_since() {
        assert_eq!(seconds_since(at(2, 0), at(8, 0)), 6.0);
        assert_eq!(seconds_since(at(2, 0), at(2, 500_000_000)), 0.5);
        assert_eq!(seconds_since(at(5, 0), at(2, 0)), -3.0);
    }
}
