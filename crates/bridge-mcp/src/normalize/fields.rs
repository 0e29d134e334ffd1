//! Candidate-key field extraction.
//!
//! Upstream schemas drift between API versions, so every normalized field is
//! declared with an ordered list of candidate source keys. Candidates are
//! evaluated in order and the first one present (and non-null) wins. A
//! candidate may be a dotted path (`fields.status.name`); numeric path parts
//! index into arrays (`errors.0.title`).

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

/// Ordered candidate source keys for one normalized field.
pub type Candidates = &'static [&'static str];

/// Keys that commonly hold the readable text of a list element.
pub const ITEM_TEXT: Candidates = &["text", "summary", "title", "name", "label", "value"];

/// Resolve a dotted path.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, part| match current {
        Value::Object(map) => map.get(part),
        Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// First candidate that is present and not null.
pub fn first<'a>(value: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|path| lookup(value, path))
        .find(|v| !v.is_null())
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First candidate holding a scalar, rendered as a string.
pub fn opt_string(value: &Value, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|path| lookup(value, path))
        .find_map(scalar_string)
}

/// Like [`opt_string`], defaulting to an empty string.
pub fn string(value: &Value, candidates: &[&str]) -> String {
    opt_string(value, candidates).unwrap_or_default()
}

/// First candidate holding an integer (numbers or numeric strings), else 0.
pub fn integer(value: &Value, candidates: &[&str]) -> i64 {
    candidates
        .iter()
        .filter_map(|path| lookup(value, path))
        .find_map(|v| match v {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .unwrap_or(0)
}

/// First candidate holding a boolean, else `false`.
pub fn boolean(value: &Value, candidates: &[&str]) -> bool {
    candidates
        .iter()
        .filter_map(|path| lookup(value, path))
        .find_map(Value::as_bool)
        .unwrap_or(false)
}

/// First candidate holding an array, as strings.
///
/// String elements are taken as-is; object elements contribute the first of
/// `item_keys` they carry. Absent lists normalize to an empty vector.
pub fn string_list_with(value: &Value, candidates: &[&str], item_keys: &[&str]) -> Vec<String> {
    candidates
        .iter()
        .filter_map(|path| lookup(value, path))
        .find_map(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(_) => opt_string(item, item_keys),
                    other => scalar_string(other),
                })
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// [`string_list_with`] using [`ITEM_TEXT`] for object elements.
pub fn string_list(value: &Value, candidates: &[&str]) -> Vec<String> {
    string_list_with(value, candidates, ITEM_TEXT)
}

/// First candidate that parses as a timestamp.
///
/// Accepts RFC 3339 strings, Jira's `+0000` offsets, bare dates, and Unix
/// epoch seconds (numbers or Slack-style `"1712345678.000100"` strings).
pub fn timestamp(value: &Value, candidates: &[&str]) -> Option<DateTime<Utc>> {
    candidates
        .iter()
        .filter_map(|path| lookup(value, path))
        .find_map(parse_timestamp)
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_f64().and_then(from_epoch),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt));
            }
            s.parse::<f64>().ok().and_then(from_epoch)
        }
        _ => None,
    }
}

fn from_epoch(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    let secs = seconds.trunc() as i64;
    let nanos = ((seconds.fract()) * 1_000_000_000.0).round() as u32;
    Utc.timestamp_opt(secs, nanos.min(999_999_999)).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_candidate_wins() {
        let value = json!({"meeting_summary": "second", "summary": "first"});
        assert_eq!(string(&value, &["summary", "meeting_summary"]), "first");
        assert_eq!(string(&value, &["overview", "meeting_summary"]), "second");
    }

    #[test]
    fn test_null_is_absent() {
        let value = json!({"summary": null, "meeting_summary": "fallback"});
        assert_eq!(string(&value, &["summary", "meeting_summary"]), "fallback");
    }

    #[test]
    fn test_dotted_paths_and_indices() {
        let value = json!({
            "fields": {"status": {"name": "In Progress"}},
            "errors": [{"title": "Page not found"}]
        });
        assert_eq!(string(&value, &["fields.status.name"]), "In Progress");
        assert_eq!(string(&value, &["errors.0.title"]), "Page not found");
        assert_eq!(string(&value, &["errors.1.title"]), "");
    }

    #[test]
    fn test_integers_and_booleans() {
        let value = json!({"num_members": "42", "duration": 30.0, "is_private": true});
        assert_eq!(integer(&value, &["num_members"]), 42);
        assert_eq!(integer(&value, &["duration"]), 30);
        assert_eq!(integer(&value, &["missing"]), 0);
        assert!(boolean(&value, &["is_private"]));
        assert!(!boolean(&value, &["is_archived"]));
    }

    #[test]
    fn test_string_lists() {
        let value = json!({
            "keyPoints": ["Ship v2", "  ", "Hire"],
            "summary_details": [{"label": "Budget", "summary": "Approved"}]
        });
        assert_eq!(
            string_list(&value, &["key_points", "keyPoints"]),
            vec!["Ship v2", "Hire"]
        );
        assert_eq!(string_list(&value, &["summary_details"]), vec!["Approved"]);
        assert!(string_list(&value, &["next_steps"]).is_empty());
    }

    #[test]
    fn test_timestamps() {
        let value = json!({
            "start_time": "2026-03-02T15:00:00Z",
            "created": "2026-03-02T15:00:00.000+0000",
            "ts": "1772463600.000200",
            "day": "2026-03-02"
        });
        let expected = Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap();
        assert_eq!(timestamp(&value, &["start_time"]), Some(expected));
        assert_eq!(timestamp(&value, &["created"]), Some(expected));
        assert_eq!(
            timestamp(&value, &["ts"]).map(|t| t.timestamp()),
            Some(1_772_463_600)
        );
        assert_eq!(
            timestamp(&value, &["day"]).map(|t| t.date_naive().to_string()),
            Some("2026-03-02".to_string())
        );
        assert_eq!(timestamp(&value, &["missing"]), None);
    }
}
