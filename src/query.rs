use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Case-insensitive substring matcher shared by every loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    raw: String,
    lower: String,
}

impl Keyword {
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            lower: raw.to_lowercase(),
        }
    }

    /// `None` and empty strings mean "no keyword filter".
    pub fn from_option(raw: Option<&str>) -> Option<Self> {
        raw.filter(|s| !s.is_empty()).map(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.lower)
    }

    pub fn matches_any(&self, texts: &[&str]) -> bool {
        texts.iter().any(|t| self.matches(t))
    }

    /// Byte offset into `text` of the first case-insensitive occurrence.
    pub fn find_in(&self, text: &str) -> Option<usize> {
        text.char_indices()
            .map(|(i, _)| i)
            .find(|&i| starts_with_ci(&text[i..], &self.raw))
    }
}

fn starts_with_ci(text: &str, needle: &str) -> bool {
    let mut hay = text.chars().flat_map(char::to_lowercase);
    needle
        .chars()
        .flat_map(char::to_lowercase)
        .all(|c| hay.next() == Some(c))
}

/// Inclusive `YYYY-MM-DD` bounds.
///
/// Only the calendar date of a timestamp is compared. Epoch-millisecond values
/// are converted to a UTC date; ISO strings are truncated to their first ten
/// characters, so any time-of-day or offset is ignored. This is lossy on purpose:
/// an entry written at 23:30-05:00 counts toward the date printed in its own
/// string, not toward the UTC day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl DateRange {
    pub fn new(start_date: Option<&str>, end_date: Option<&str>) -> Self {
        Self {
            start_date: start_date.filter(|s| !s.is_empty()).map(str::to_string),
            end_date: end_date.filter(|s| !s.is_empty()).map(str::to_string),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none()
    }

    pub fn contains_millis(&self, timestamp_ms: i64) -> bool {
        if self.is_unbounded() {
            return true;
        }
        match DateTime::from_timestamp_millis(timestamp_ms) {
            Some(dt) => self.contains_date(&dt.format("%Y-%m-%d").to_string()),
            None => false,
        }
    }

    pub fn contains_iso(&self, iso: &str) -> bool {
        if self.is_unbounded() {
            return true;
        }
        self.contains_date(iso.get(..10).unwrap_or(iso))
    }

    /// Lexicographic comparison, which is chronological for `YYYY-MM-DD`.
    pub fn contains_date(&self, date: &str) -> bool {
        if let Some(start) = &self.start_date {
            if date < start.as_str() {
                return false;
            }
        }
        if let Some(end) = &self.end_date {
            if date > end.as_str() {
                return false;
            }
        }
        true
    }
}

/// Leading `max_chars` characters of `text`.
pub fn prefix_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Window of `text` around the byte offset `at`, extended `before` characters
/// back and `after` characters forward from `at + len`, clamped to the text.
pub fn excerpt_around(text: &str, at: usize, len: usize, before: usize, after: usize) -> &str {
    let start = text[..at]
        .char_indices()
        .rev()
        .take(before)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(at);
    let anchor = (at + len).min(text.len());
    let anchor = (anchor..=text.len())
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(text.len());
    let end = text[anchor..]
        .char_indices()
        .nth(after)
        .map(|(i, _)| anchor + i)
        .unwrap_or(text.len());
    &text[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_is_case_insensitive() {
        let kw = Keyword::new("ApPle");
        assert!(kw.matches("green apple pie"));
        assert!(!kw.matches("banana"));
        assert_eq!(kw.find_in("An APPLE a day"), Some(3));
        assert_eq!(kw.find_in("pear"), None);
        assert!(Keyword::from_option(Some("")).is_none());
    }

    #[test]
    fn date_range_on_iso_timestamp() {
        let day = DateRange::new(Some("2024-06-15"), Some("2024-06-15"));
        assert!(day.contains_iso("2024-06-15T10:00:00Z"));

        let before = DateRange::new(None, Some("2024-06-14"));
        assert!(!before.contains_iso("2024-06-15T10:00:00Z"));

        assert!(DateRange::default().contains_iso("not a date"));
    }

    #[test]
    fn date_range_on_epoch_millis() {
        // 2024-06-15T10:00:00Z
        let ts = 1_718_445_600_000;
        assert!(DateRange::new(Some("2024-06-15"), Some("2024-06-15")).contains_millis(ts));
        assert!(!DateRange::new(Some("2024-06-16"), None).contains_millis(ts));
        assert!(!DateRange::new(None, Some("2024-06-14")).contains_millis(ts));
        assert!(DateRange::default().contains_millis(ts));
    }

    #[test]
    fn excerpts_respect_char_boundaries() {
        assert_eq!(prefix_chars("héllo", 2), "hé");
        assert_eq!(prefix_chars("hi", 10), "hi");

        let text = "0123456789needle0123456789";
        let at = Keyword::new("NEEDLE").find_in(text).unwrap();
        assert_eq!(excerpt_around(text, at, 6, 3, 2), "789needle01");
        assert_eq!(excerpt_around(text, at, 6, 50, 100), text);
    }
}
