//! ISO-8601 date formatting (C7): `YYYY-MM-DDTHH:MM:SS.sssZ`, UTC, millisecond
//! precision.

use chrono::{DateTime, SecondsFormat, Utc};

pub fn format_millis(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_millis() -> String {
    format_millis(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_with_millisecond_precision_and_z_suffix() {
        let t = Utc.timestamp_opt(1_700_000_000, 123_000_000).unwrap();
        let s = format_millis(t);
        assert!(s.ends_with('Z'));
        assert!(s.contains('.'));
        assert_eq!(s.len(), "2023-11-14T22:13:20.123Z".len());
    }
}
