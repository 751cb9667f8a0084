//! Formatting utilities for CLI output.

use chrono::{DateTime, Utc};

/// Truncate a string to a maximum length with ellipsis.
///
/// If the string is longer than `max_len`, it is truncated and `...` is
/// appended. The total output length will be at most `max_len` characters.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        ".".repeat(max_len)
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

/// Format a timestamp as relative time (e.g., "3h ago", "2d ago").
pub fn format_relative_time(timestamp: DateTime<Utc>) -> String {
    let now = Utc::now();
    let duration = now.signed_duration_since(timestamp);

    if duration.num_seconds() < 0 {
        return timestamp.format("%Y-%m-%d").to_string();
    }

    if duration.num_minutes() < 1 {
        "just now".to_string()
    } else if duration.num_hours() < 1 {
        format!("{} mins ago", duration.num_minutes())
    } else if duration.num_hours() < 24 {
        format!("{}h ago", duration.num_hours())
    } else if duration.num_days() < 7 {
        format!("{}d ago", duration.num_days())
    } else {
        timestamp.format("%Y-%m-%d").to_string()
    }
}

/// Format a page range for display.
pub fn format_pages(start: u32, end: u32) -> String {
    if start == end {
        format!("p. {}", start)
    } else {
        format!("pp. {}-{}", start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("abc", 2), "..");
    }

    #[test]
    fn test_format_pages() {
        assert_eq!(format_pages(4, 4), "p. 4");
        assert_eq!(format_pages(3, 7), "pp. 3-7");
    }

    #[test]
    fn test_relative_time_just_now() {
        assert_eq!(format_relative_time(Utc::now()), "just now");
    }
}
