use chrono::{DateTime, Local, Utc};
use std::path::Path;

/// Formats a ledger timestamp in local time
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Formats a relative time from now
#[must_use]
pub fn format_relative_time(timestamp: &DateTime<Utc>) -> String {
    format_relative_time_since(timestamp, &Utc::now())
}

fn format_relative_time_since(timestamp: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(*timestamp).num_seconds();

    if diff < 0 {
        return "in the future".to_string();
    }

    let (value, unit) = if diff < 60 {
        (diff, "second")
    } else if diff < 3600 {
        (diff / 60, "minute")
    } else if diff < 86400 {
        (diff / 3600, "hour")
    } else if diff < 2_592_000 {
        (diff / 86400, "day")
    } else if diff < 31_536_000 {
        (diff / 2_592_000, "month")
    } else {
        (diff / 31_536_000, "year")
    };

    if value == 1 {
        format!("{value} {unit} ago")
    } else {
        format!("{value} {unit}s ago")
    }
}

/// Shows `path` with the home directory abbreviated to `~`
#[must_use]
pub fn format_path(path: &Path, home: Option<&Path>) -> String {
    if let Some(home) = home
        && let Ok(rest) = path.strip_prefix(home)
    {
        if rest.as_os_str().is_empty() {
            return "~".to_string();
        }
        return format!("~/{}", rest.display());
    }
    path.display().to_string()
}

/// `1 file`, `3 files`
#[must_use]
pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

/// Truncates a string to a maximum number of characters with ellipsis
#[must_use]
pub fn truncate_with_ellipsis(s: &str, max_len: usize) -> String {
    let len = s.chars().count();
    if len <= max_len {
        s.to_string()
    } else if max_len < 3 {
        s.chars().take(max_len).collect()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_relative_time_units() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let cases = [
            (Duration::seconds(1), "1 second ago"),
            (Duration::seconds(42), "42 seconds ago"),
            (Duration::minutes(5), "5 minutes ago"),
            (Duration::hours(1), "1 hour ago"),
            (Duration::days(3), "3 days ago"),
            (Duration::days(65), "2 months ago"),
            (Duration::days(800), "2 years ago"),
        ];
        for (ago, expected) in cases {
            assert_eq!(format_relative_time_since(&(now - ago), &now), expected);
        }
        assert_eq!(
            format_relative_time_since(&(now + Duration::minutes(1)), &now),
            "in the future"
        );
    }

    #[test]
    fn test_timestamp_shape() {
        let stamp = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let formatted = format_timestamp(&stamp);
        assert_eq!(formatted.len(), "2024-01-02 03:04:05".len());
        assert!(formatted.starts_with("2024-01-0"));
    }

    #[test]
    fn test_format_path_abbreviates_home() {
        let home = Path::new("/home/alice");
        assert_eq!(
            format_path(Path::new("/home/alice/.bashrc"), Some(home)),
            "~/.bashrc"
        );
        assert_eq!(format_path(home, Some(home)), "~");
        assert_eq!(format_path(Path::new("/etc/hosts"), Some(home)), "/etc/hosts");
        assert_eq!(format_path(Path::new("/etc/hosts"), None), "/etc/hosts");
    }

    #[test]
    fn test_pluralize_and_truncate() {
        assert_eq!(pluralize(1, "file", "files"), "1 file");
        assert_eq!(pluralize(0, "file", "files"), "0 files");
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
        assert_eq!(truncate_with_ellipsis("a long package name", 10), "a long ...");
        assert_eq!(truncate_with_ellipsis("héllo", 2), "hé");
    }
}
