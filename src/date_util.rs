use chrono::{DateTime, NaiveDateTime, Utc};

/// Storage format for issue timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a Jira timestamp such as `2025-12-15T14:34:02.000+0000`.
///
/// Only the first 19 characters (`YYYY-MM-DDTHH:MM:SS`) are considered;
/// fractional seconds and the zone suffix are ignored. Anything that does not
/// fit yields `None`.
pub fn parse_jira_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let prefix = raw.get(..19)?;
    NaiveDateTime::parse_from_str(prefix, "%Y-%m-%dT%H:%M:%S").ok()
}

/// Convert a duration in seconds to hours, rounded to two decimals.
///
/// The rounding is done on the exact rational value in integer arithmetic,
/// half away from zero, so `18` seconds (0.005 h) becomes `0.01`.
pub fn seconds_to_hours(seconds: i64) -> f64 {
    let magnitude = (seconds.unsigned_abs() as u128 * 100 + 1800) / 3600;
    let hundredths = magnitude as f64 / 100.0;
    if seconds < 0 {
        -hundredths
    } else {
        hundredths
    }
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_stored_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok()
}

/// Current time as microseconds since the Unix epoch.
pub fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

pub fn micros_to_datetime(micros: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
}

/// Round to `places` decimals for display figures.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_parse_jira_timestamp_with_millis_and_zone() {
        assert_eq!(
            parse_jira_timestamp("2025-12-15T14:34:02.000+0000"),
            Some(dt(2025, 12, 15, 14, 34, 2))
        );
    }

    #[test]
    fn test_parse_jira_timestamp_exact_prefix() {
        assert_eq!(
            parse_jira_timestamp("2025-01-01T00:00:00"),
            Some(dt(2025, 1, 1, 0, 0, 0))
        );
    }

    #[test]
    fn test_parse_jira_timestamp_garbage() {
        assert_eq!(parse_jira_timestamp(""), None);
        assert_eq!(parse_jira_timestamp("2025-12-15"), None);
        assert_eq!(parse_jira_timestamp("not a timestamp at all"), None);
        assert_eq!(parse_jira_timestamp("2025-13-45T99:00:00.000+0000"), None);
        // Multi-byte text must not panic on the prefix slice
        assert_eq!(parse_jira_timestamp("дата создания задачи неизвестна"), None);
    }

    #[test]
    fn test_seconds_to_hours() {
        assert_eq!(seconds_to_hours(7230), 2.01);
        assert_eq!(seconds_to_hours(3600), 1.0);
        assert_eq!(seconds_to_hours(0), 0.0);
        assert_eq!(seconds_to_hours(5400), 1.5);
        assert_eq!(seconds_to_hours(28800), 8.0);
    }

    #[test]
    fn test_seconds_to_hours_half_rounds_away_from_zero() {
        assert_eq!(seconds_to_hours(18), 0.01);
        assert_eq!(seconds_to_hours(17), 0.0);
        assert_eq!(seconds_to_hours(-18), -0.01);
    }

    #[test]
    fn test_stored_timestamp_round_trip() {
        let ts = dt(2025, 10, 3, 9, 5, 0);
        let s = format_timestamp(&ts);
        assert_eq!(s, "2025-10-03 09:05:00");
        assert_eq!(parse_stored_timestamp(&s), Some(ts));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(106.25, 2), 106.25);
        assert_eq!(round_to(33.333_333, 1), 33.3);
    }
}
