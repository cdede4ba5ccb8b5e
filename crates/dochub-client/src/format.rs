//! Human-readable renderings of sizes, timestamps and content types.

use chrono::{DateTime, Utc};

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;
const TIB: u64 = GIB * 1024;

/// `"512 B"`, `"1.5 KiB"`, `"3.0 MiB"`, ...
#[allow(clippy::cast_precision_loss)]
pub fn format_file_size(bytes: u64) -> String {
    let (unit, divisor) = match bytes {
        b if b < KIB => return format!("{b} B"),
        b if b < MIB => ("KiB", KIB),
        b if b < GIB => ("MiB", MIB),
        b if b < TIB => ("GiB", GIB),
        _ => ("TiB", TIB),
    };
    format!("{:.1} {unit}", bytes as f64 / divisor as f64)
}

/// Relative age of `timestamp` as seen at `now`. Anything 30 days or older is
/// shown as a date; timestamps in the future count as "just now".
pub fn format_time_passed(now: DateTime<Utc>, timestamp: DateTime<Utc>) -> String {
    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;

    let seconds = (now - timestamp).num_seconds();
    match seconds {
        s if s < MINUTE => "just now".to_owned(),
        s if s < 2 * MINUTE => "one minute ago".to_owned(),
        s if s < HOUR => format!("{} minutes ago", s / MINUTE),
        s if s < 2 * HOUR => "one hour ago".to_owned(),
        s if s < DAY => format!("{} hours ago", s / HOUR),
        s if s < 2 * DAY => "one day ago".to_owned(),
        s if s < 30 * DAY => format!("{} days ago", s / DAY),
        _ => timestamp.format("%-d %b %Y, %H:%M").to_string(),
    }
}

/// Full timestamp with seconds, e.g. for a tooltip or detail view.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%-d %b %Y, %H:%M:%S").to_string()
}

/// `"MM:SS"`, or `"H:MM:SS"` from one hour on.
pub fn format_duration(seconds: u64) -> String {
    let s = seconds % 60;
    let m = seconds / 60 % 60;
    let h = seconds / 3600;
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

/// Short badge text for a content type; `"???"` for anything unrecognised.
pub fn content_type_extension(content_type: &str) -> &'static str {
    match content_type {
        "application/pdf" => "PDF",
        "image/png" => "PNG",
        "image/jpeg" => "JPG",
        "image/svg+xml" => "SVG",
        _ => "???",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(1023), "1023 B");
        assert_eq!(format_file_size(1024), "1.0 KiB");
        assert_eq!(format_file_size(1536), "1.5 KiB");
        assert_eq!(format_file_size(3 * MIB), "3.0 MiB");
        assert_eq!(format_file_size(5 * GIB + GIB / 2), "5.5 GiB");
        assert_eq!(format_file_size(2 * TIB), "2.0 TiB");
    }

    #[test]
    fn time_passed() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let ago = |d: Duration| format_time_passed(now, now - d);

        assert_eq!(ago(Duration::seconds(59)), "just now");
        assert_eq!(ago(Duration::seconds(60)), "one minute ago");
        assert_eq!(ago(Duration::minutes(5)), "5 minutes ago");
        assert_eq!(ago(Duration::minutes(61)), "one hour ago");
        assert_eq!(ago(Duration::hours(5)), "5 hours ago");
        assert_eq!(ago(Duration::hours(25)), "one day ago");
        assert_eq!(ago(Duration::days(29)), "29 days ago");
        assert_eq!(ago(Duration::days(30)), "14 Feb 2024, 12:00");
    }

    #[test]
    fn future_timestamps_are_just_now() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        assert_eq!(
            format_time_passed(now, now + Duration::seconds(5)),
            "just now"
        );
    }

    #[test]
    fn full_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 9, 7, 3).unwrap();
        assert_eq!(format_timestamp(ts), "5 Mar 2024, 09:07:03");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(75), "01:15");
        assert_eq!(format_duration(3599), "59:59");
        assert_eq!(format_duration(3600), "1:00:00");
        assert_eq!(format_duration(2 * 3600 + 5 * 60 + 9), "2:05:09");
    }

    #[test]
    fn content_type_badges() {
        assert_eq!(content_type_extension("application/pdf"), "PDF");
        assert_eq!(content_type_extension("image/jpeg"), "JPG");
        assert_eq!(content_type_extension("text/plain"), "???");
    }
}
