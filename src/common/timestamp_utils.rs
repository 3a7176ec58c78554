use chrono::{DateTime, Local};

// Get current local timestamp as a formatted string
pub fn current_local_timestamp_str(format_str: &str) -> String {
    let now: DateTime<Local> = Local::now();
    now.format(format_str).to_string()
}

/// Pretty-print a server timestamp for dashboard rows. Accepts RFC 3339 or
/// `YYYY-MM-DDTHH:MM:SS` style strings; anything unparseable is shown as-is,
/// a missing value as "-".
pub fn fmt_ts(ts: Option<&str>) -> String {
    let Some(raw) = ts else { return "-".to_string() };
    if raw.is_empty() {
        return "-".to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return naive.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_rfc3339() {
        assert_eq!(fmt_ts(Some("2026-08-30T12:34:56+00:00")), "2026-08-30 12:34:56");
    }

    #[test]
    fn formats_naive_with_fraction() {
        assert_eq!(fmt_ts(Some("2026-08-30T12:34:56.789")), "2026-08-30 12:34:56");
    }

    #[test]
    fn missing_and_garbage() {
        assert_eq!(fmt_ts(None), "-");
        assert_eq!(fmt_ts(Some("")), "-");
        assert_eq!(fmt_ts(Some("yesterday")), "yesterday");
    }
}
