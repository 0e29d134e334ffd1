//! Response normalization.
//!
//! Maps a [`RawResponse`] onto one of a closed set of record kinds. A payload
//! that is not the expected structure yields `None` (unrecognized format)
//! rather than an error; callers decide how to report that.

pub mod fields;
pub mod records;
pub mod text;

pub use records::{is_issue_key, Channel, Issue, Meeting, MeetingSummary, Message, Page, Space, User};

use crate::executor::RawResponse;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Kinds of normalized record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Meeting,
    MeetingSummary,
    Message,
    Channel,
    User,
    Issue,
    Page,
    Space,
}

/// A normalized record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizedRecord {
    Meeting(Meeting),
    MeetingSummary(MeetingSummary),
    Message(Message),
    Channel(Channel),
    User(User),
    Issue(Issue),
    Page(Page),
    Space(Space),
}

impl NormalizedRecord {
    /// Normalize one JSON object.
    pub fn from_value(value: &Value, kind: RecordKind) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        match kind {
            RecordKind::Meeting => Meeting::from_value(value).map(Self::Meeting),
            RecordKind::MeetingSummary => {
                MeetingSummary::from_value(value).map(Self::MeetingSummary)
            }
            RecordKind::Message => Message::from_value(value).map(Self::Message),
            RecordKind::Channel => Channel::from_value(value).map(Self::Channel),
            RecordKind::User => User::from_value(value).map(Self::User),
            RecordKind::Issue => Issue::from_value(value).map(Self::Issue),
            RecordKind::Page => Page::from_value(value).map(Self::Page),
            RecordKind::Space => Space::from_value(value).map(Self::Space),
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Meeting(_) => RecordKind::Meeting,
            Self::MeetingSummary(_) => RecordKind::MeetingSummary,
            Self::Message(_) => RecordKind::Message,
            Self::Channel(_) => RecordKind::Channel,
            Self::User(_) => RecordKind::User,
            Self::Issue(_) => RecordKind::Issue,
            Self::Page(_) => RecordKind::Page,
            Self::Space(_) => RecordKind::Space,
        }
    }
}

impl fmt::Display for NormalizedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Meeting(r) => r.fmt(f),
            Self::MeetingSummary(r) => r.fmt(f),
            Self::Message(r) => r.fmt(f),
            Self::Channel(r) => r.fmt(f),
            Self::User(r) => r.fmt(f),
            Self::Issue(r) => r.fmt(f),
            Self::Page(r) => r.fmt(f),
            Self::Space(r) => r.fmt(f),
        }
    }
}

macro_rules! record_conversions {
    ($($variant:ident),*) => {$(
        impl TryFrom<NormalizedRecord> for $variant {
            type Error = NormalizedRecord;

            fn try_from(record: NormalizedRecord) -> Result<Self, Self::Error> {
                match record {
                    NormalizedRecord::$variant(inner) => Ok(inner),
                    other => Err(other),
                }
            }
        }
    )*};
}

record_conversions!(Meeting, MeetingSummary, Message, Channel, User, Issue, Page, Space);

/// Normalize a single-record response.
pub fn normalize(raw: RawResponse, kind: RecordKind) -> Option<NormalizedRecord> {
    let value = raw.into_json()?;
    NormalizedRecord::from_value(&value, kind)
}

/// Normalize a single record wrapped in an envelope (`{"user": {...}}`).
///
/// The first of `keys` holding an object is used; the root is the fallback.
pub fn normalize_nested(raw: RawResponse, kind: RecordKind, keys: &[&str]) -> Option<NormalizedRecord> {
    let value = raw.into_json()?;
    let record = keys
        .iter()
        .filter_map(|key| fields::lookup(&value, key))
        .find(|v| v.is_object())
        .unwrap_or(&value);
    NormalizedRecord::from_value(record, kind)
}

/// Normalize a list response.
///
/// The list is taken from the first of `collection_keys` holding an array
/// (dotted paths allowed); a top-level array is used when no key matches.
/// Entries that are not objects, or lack the record's identity, are skipped.
pub fn normalize_list(raw: RawResponse, kind: RecordKind, collection_keys: &[&str]) -> Vec<NormalizedRecord> {
    let Some(value) = raw.into_json() else {
        return Vec::new();
    };

    let items = collection_keys
        .iter()
        .filter_map(|key| fields::lookup(&value, key))
        .find_map(Value::as_array)
        .or_else(|| value.as_array());

    items
        .map(|items| {
            items
                .iter()
                .filter_map(|item| NormalizedRecord::from_value(item, kind))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_single() {
        let raw = RawResponse::Json(json!({"id": "C01", "name": "general"}));
        let record = normalize(raw, RecordKind::Channel).unwrap();
        assert_eq!(record.kind(), RecordKind::Channel);
        let channel = Channel::try_from(record).unwrap();
        assert_eq!(channel.name, "general");
    }

    #[test]
    fn test_unrecognized_format_is_none() {
        assert!(normalize(RawResponse::Text("<html>".into()), RecordKind::Page).is_none());
        assert!(normalize(RawResponse::Json(json!([1, 2])), RecordKind::Page).is_none());
    }

    #[test]
    fn test_normalize_nested() {
        let raw = RawResponse::Json(json!({"ok": true, "user": {"id": "U01", "name": "dana"}}));
        let record = normalize_nested(raw, RecordKind::User, &["user"]).unwrap();
        assert_eq!(record.kind(), RecordKind::User);
    }

    #[test]
    fn test_normalize_list_collection_keys() {
        let raw = RawResponse::Json(json!({
            "messages": {"matches": [
                {"ts": "1772463600.000100", "text": "planning notes"},
                "not an object",
                {"ts": "1772463601.000100", "text": "lunch?"}
            ]}
        }));
        let records = normalize_list(raw, RecordKind::Message, &["messages.matches", "messages"]);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_normalize_list_top_level_array() {
        let raw = RawResponse::Text(r#"[{"id": "1", "key": "ENG"}]"#.into());
        let records = normalize_list(raw, RecordKind::Space, &["results"]);
        assert_eq!(records.len(), 1);
        assert!(normalize_list(RawResponse::Text("nope".into()), RecordKind::Space, &[]).is_empty());
    }
}
