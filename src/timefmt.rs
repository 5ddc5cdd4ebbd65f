//! Protocol timestamp handling
//!
//! Two clocks travel with every request:
//!
//! - `xtime`: epoch milliseconds, the envelope timestamp and IV seed. Taken
//!   fresh per encryption, never reused.
//! - `sig_time`: the same instant truncated to whole seconds, bound into the
//!   HMAC signatures. The seconds/milliseconds distinction is load-bearing;
//!   a millisecond value here produces a silently rejected signature.
//!
//! Plus two header formats the backend is picky about: a "java-like"
//! ISO-8601 timestamp with a 2-digit fraction and colon offset, and a GMT+7
//! variant with 3-digit millis and no offset colon.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

/// Current epoch milliseconds; call per encryption, never reuse
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Truncate an envelope timestamp to signature seconds
pub fn sig_time(xtime_ms: i64) -> i64 {
    xtime_ms / 1000
}

/// The backend's home offset (GMT+7)
pub fn gmt7() -> FixedOffset {
    FixedOffset::east_opt(7 * 3600).expect("static offset")
}

/// `YYYY-MM-DDTHH:MM:SS.ff+HH:MM` — 2-digit fraction, colon offset
///
/// Used for the `x-request-at` header.
pub fn java_like_timestamp<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let frac2 = (dt.timestamp_subsec_micros() % 1_000_000) / 10_000;
    format!(
        "{}.{:02}{}",
        dt.format("%Y-%m-%dT%H:%M:%S"),
        frac2,
        dt.format("%:z")
    )
}

/// `YYYY-MM-DDTHH:MM:SS.mmm+0700` — GMT+7, 3-digit millis, offset without colon
pub fn ts_gmt7_without_colon<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let local = dt.with_timezone(&gmt7());
    let millis = (local.timestamp_subsec_millis() % 1000) as u32;
    format!(
        "{}.{:03}{}",
        local.format("%Y-%m-%dT%H:%M:%S"),
        millis,
        local.format("%z")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> DateTime<FixedOffset> {
        gmt7()
            .with_ymd_and_hms(2024, 1, 31, 9, 5, 7)
            .unwrap()
            .checked_add_signed(chrono::Duration::microseconds(123_456))
            .unwrap()
    }

    #[test]
    fn test_sig_time_truncates_milliseconds() {
        assert_eq!(sig_time(1_700_000_000_000), 1_700_000_000);
        assert_eq!(sig_time(1_700_000_000_999), 1_700_000_000);
    }

    #[test]
    fn test_java_like_timestamp_format() {
        assert_eq!(java_like_timestamp(&sample()), "2024-01-31T09:05:07.12+07:00");
    }

    #[test]
    fn test_java_like_timestamp_zero_fraction() {
        let dt = gmt7().with_ymd_and_hms(2024, 1, 31, 9, 5, 7).unwrap();
        assert_eq!(java_like_timestamp(&dt), "2024-01-31T09:05:07.00+07:00");
    }

    #[test]
    fn test_gmt7_without_colon_format() {
        assert_eq!(
            ts_gmt7_without_colon(&sample()),
            "2024-01-31T09:05:07.123+0700"
        );
    }

    #[test]
    fn test_gmt7_without_colon_converts_offset() {
        let utc = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        assert_eq!(
            ts_gmt7_without_colon(&utc),
            "2024-01-31T07:00:00.000+0700"
        );
    }

    #[test]
    fn test_now_ms_is_milliseconds() {
        let ms = now_ms();
        // epoch seconds would be ~1.7e9; milliseconds ~1.7e12
        assert!(ms > 1_000_000_000_000);
    }
}
