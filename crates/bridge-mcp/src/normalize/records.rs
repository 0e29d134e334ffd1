//! Normalized domain records.
//!
//! Each record has a fixed field set. Every field absent upstream resolves to
//! an explicit default (empty string, zero, empty list, `None` timestamp).
//! `Display` renders the text block used in tool results, always in the same
//! field order.

use super::fields::{self, Candidates};
use super::text::{flatten_document, strip_markup};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

fn write_opt(f: &mut fmt::Formatter<'_>, label: &str, value: &str) -> fmt::Result {
    if value.is_empty() {
        Ok(())
    } else {
        write!(f, "\n{}: {}", label, value)
    }
}

fn write_time(f: &mut fmt::Formatter<'_>, label: &str, value: &Option<DateTime<Utc>>) -> fmt::Result {
    match value {
        Some(ts) => write!(f, "\n{}: {}", label, ts.format("%Y-%m-%d %H:%M UTC")),
        None => Ok(()),
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, label: &str, items: &[String]) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    write!(f, "\n{}:", label)?;
    for item in items {
        write!(f, "\n  - {}", item)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Zoom
// ---------------------------------------------------------------------------

/// A scheduled, live or past meeting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meeting {
    pub id: String,
    pub uuid: String,
    pub topic: String,
    pub start_time: Option<DateTime<Utc>>,
    pub duration_minutes: i64,
    pub timezone: String,
    pub host_email: String,
    pub join_url: String,
    pub agenda: String,
    pub recording_files: Vec<String>,
}

impl Meeting {
    const ID: Candidates = &["id", "meeting_id", "meetingId"];
    const UUID: Candidates = &["uuid", "meeting_uuid"];
    const TOPIC: Candidates = &["topic", "title", "meeting_topic"];
    const START: Candidates = &["start_time", "startTime", "start"];
    const DURATION: Candidates = &["duration", "total_minutes"];
    const TIMEZONE: Candidates = &["timezone"];
    const HOST: Candidates = &["host_email", "host.email"];
    const JOIN_URL: Candidates = &["join_url", "joinUrl"];
    const AGENDA: Candidates = &["agenda", "description"];
    const RECORDINGS: Candidates = &["recording_files", "recordings"];
    const RECORDING_KIND: Candidates = &["recording_type", "file_type"];

    pub fn from_value(value: &Value) -> Option<Self> {
        let id = fields::string(value, Self::ID);
        let uuid = fields::string(value, Self::UUID);
        if id.is_empty() && uuid.is_empty() {
            return None;
        }
        Some(Self {
            id,
            uuid,
            topic: fields::string(value, Self::TOPIC),
            start_time: fields::timestamp(value, Self::START),
            duration_minutes: fields::integer(value, Self::DURATION),
            timezone: fields::string(value, Self::TIMEZONE),
            host_email: fields::string(value, Self::HOST),
            join_url: fields::string(value, Self::JOIN_URL),
            agenda: fields::string(value, Self::AGENDA),
            recording_files: fields::string_list_with(value, Self::RECORDINGS, Self::RECORDING_KIND),
        })
    }

    /// Identifier for follow-up calls: the UUID when known, else the numeric id.
    pub fn summary_key(&self) -> &str {
        if self.uuid.is_empty() {
            &self.id
        } else {
            &self.uuid
        }
    }
}

impl fmt::Display for Meeting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topic = if self.topic.is_empty() { "(untitled meeting)" } else { &self.topic };
        write!(f, "Topic: {}", topic)?;
        write_opt(f, "ID", &self.id)?;
        write_opt(f, "UUID", &self.uuid)?;
        write_time(f, "Start", &self.start_time)?;
        if self.duration_minutes > 0 {
            write!(f, "\nDuration: {} min", self.duration_minutes)?;
        }
        write_opt(f, "Timezone", &self.timezone)?;
        write_opt(f, "Host", &self.host_email)?;
        write_opt(f, "Join URL", &self.join_url)?;
        write_opt(f, "Agenda", &self.agenda)?;
        write_list(f, "Recordings", &self.recording_files)
    }
}

/// AI-generated summary of a past meeting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeetingSummary {
    pub meeting_id: String,
    pub meeting_uuid: String,
    pub topic: String,
    pub title: String,
    pub start_time: Option<DateTime<Utc>>,
    pub summary: String,
    pub key_points: Vec<String>,
    pub next_steps: Vec<String>,
}

impl MeetingSummary {
    const MEETING_ID: Candidates = &["meeting_id", "meetingId", "id"];
    const MEETING_UUID: Candidates = &["meeting_uuid", "meetingUuid", "uuid"];
    const TOPIC: Candidates = &["meeting_topic", "topic"];
    const TITLE: Candidates = &["summary_title", "title"];
    const START: Candidates = &["meeting_start_time", "summary_start_time", "start_time"];
    const SUMMARY: Candidates = &["summary_overview", "summary", "meeting_summary", "overview"];
    const KEY_POINTS: Candidates = &["key_points", "keyPoints", "summary_details", "highlights"];
    const NEXT_STEPS: Candidates = &["next_steps", "nextSteps", "action_items", "actionItems"];

    /// `None` when the payload carries none of the summary content fields.
    pub fn from_value(value: &Value) -> Option<Self> {
        let summary = fields::string(value, Self::SUMMARY);
        let key_points = fields::string_list(value, Self::KEY_POINTS);
        let next_steps = fields::string_list(value, Self::NEXT_STEPS);
        let recognized = fields::first(value, Self::SUMMARY).is_some()
            || fields::first(value, Self::KEY_POINTS).is_some()
            || fields::first(value, Self::NEXT_STEPS).is_some();
        if !recognized {
            return None;
        }
        Some(Self {
            meeting_id: fields::string(value, Self::MEETING_ID),
            meeting_uuid: fields::string(value, Self::MEETING_UUID),
            topic: fields::string(value, Self::TOPIC),
            title: fields::string(value, Self::TITLE),
            start_time: fields::timestamp(value, Self::START),
            summary,
            key_points,
            next_steps,
        })
    }

    /// All searchable text of the summary.
    pub fn content_text(&self) -> String {
        let mut parts = vec![self.title.as_str(), self.summary.as_str()];
        parts.extend(self.key_points.iter().map(String::as_str));
        parts.extend(self.next_steps.iter().map(String::as_str));
        parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for MeetingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heading = [&self.title, &self.topic]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or("Meeting summary");
        write!(f, "Summary: {}", heading)?;
        write_opt(f, "Meeting ID", &self.meeting_id)?;
        write_time(f, "Start", &self.start_time)?;
        write_opt(f, "Overview", &self.summary)?;
        write_list(f, "Key points", &self.key_points)?;
        write_list(f, "Next steps", &self.next_steps)
    }
}

// ---------------------------------------------------------------------------
// Slack
// ---------------------------------------------------------------------------

/// A chat message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub ts: String,
    pub user: String,
    pub username: String,
    pub text: String,
    pub channel_id: String,
    pub channel_name: String,
    pub permalink: String,
    pub thread_ts: String,
    pub reply_count: i64,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    const TS: Candidates = &["ts", "message_ts"];
    const USER: Candidates = &["user", "user_id", "bot_id"];
    const USERNAME: Candidates = &["username", "user_name", "user_profile.real_name"];
    const TEXT: Candidates = &["text", "message"];
    const CHANNEL_ID: Candidates = &["channel.id", "channel", "channel_id"];
    const CHANNEL_NAME: Candidates = &["channel.name", "channel_name"];
    const PERMALINK: Candidates = &["permalink"];
    const THREAD_TS: Candidates = &["thread_ts"];
    const REPLY_COUNT: Candidates = &["reply_count"];

    pub fn from_value(value: &Value) -> Option<Self> {
        let ts = fields::string(value, Self::TS);
        let text = fields::string(value, Self::TEXT);
        if ts.is_empty() && text.is_empty() {
            return None;
        }
        Some(Self {
            timestamp: fields::timestamp(value, Self::TS),
            ts,
            user: fields::string(value, Self::USER),
            username: fields::string(value, Self::USERNAME),
            text,
            channel_id: fields::string(value, Self::CHANNEL_ID),
            channel_name: fields::string(value, Self::CHANNEL_NAME),
            permalink: fields::string(value, Self::PERMALINK),
            thread_ts: fields::string(value, Self::THREAD_TS),
            reply_count: fields::integer(value, Self::REPLY_COUNT),
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let author = [&self.username, &self.user]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or("unknown");
        write!(f, "From: {}", author)?;
        if !self.channel_name.is_empty() {
            write!(f, "\nChannel: #{}", self.channel_name)?;
        } else {
            write_opt(f, "Channel", &self.channel_id)?;
        }
        write_time(f, "Time", &self.timestamp)?;
        if self.reply_count > 0 {
            write!(f, "\nReplies: {}", self.reply_count)?;
        }
        write_opt(f, "Link", &self.permalink)?;
        write!(f, "\n{}", self.text)
    }
}

/// A conversation (public or private channel).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub topic: String,
    pub purpose: String,
    pub member_count: i64,
    pub is_private: bool,
    pub is_archived: bool,
    pub created: Option<DateTime<Utc>>,
}

impl Channel {
    const ID: Candidates = &["id", "channel_id"];
    const NAME: Candidates = &["name", "name_normalized"];
    const TOPIC: Candidates = &["topic.value", "topic"];
    const PURPOSE: Candidates = &["purpose.value", "purpose"];
    const MEMBERS: Candidates = &["num_members", "member_count"];
    const PRIVATE: Candidates = &["is_private", "is_group"];
    const ARCHIVED: Candidates = &["is_archived"];
    const CREATED: Candidates = &["created"];

    pub fn from_value(value: &Value) -> Option<Self> {
        let id = fields::string(value, Self::ID);
        if id.is_empty() {
            return None;
        }
        Some(Self {
            id,
            name: fields::string(value, Self::NAME),
            topic: fields::string(value, Self::TOPIC),
            purpose: fields::string(value, Self::PURPOSE),
            member_count: fields::integer(value, Self::MEMBERS),
            is_private: fields::boolean(value, Self::PRIVATE),
            is_archived: fields::boolean(value, Self::ARCHIVED),
            created: fields::timestamp(value, Self::CREATED),
        })
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({})", self.name, self.id)?;
        let visibility = if self.is_private { "private" } else { "public" };
        write!(f, "\nVisibility: {}", visibility)?;
        if self.is_archived {
            write!(f, " (archived)")?;
        }
        write!(f, "\nMembers: {}", self.member_count)?;
        write_opt(f, "Topic", &self.topic)?;
        write_opt(f, "Purpose", &self.purpose)?;
        write_time(f, "Created", &self.created)
    }
}

/// A workspace member.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub real_name: String,
    pub display_name: String,
    pub email: String,
    pub title: String,
    pub timezone: String,
    pub is_bot: bool,
    pub deleted: bool,
}

impl User {
    const ID: Candidates = &["id", "user_id"];
    const NAME: Candidates = &["name", "username"];
    const REAL_NAME: Candidates = &["real_name", "profile.real_name"];
    const DISPLAY_NAME: Candidates = &["profile.display_name", "display_name"];
    const EMAIL: Candidates = &["profile.email", "email"];
    const TITLE: Candidates = &["profile.title", "title"];
    const TIMEZONE: Candidates = &["tz", "tz_label", "timezone"];
    const BOT: Candidates = &["is_bot"];
    const DELETED: Candidates = &["deleted"];

    pub fn from_value(value: &Value) -> Option<Self> {
        let id = fields::string(value, Self::ID);
        if id.is_empty() {
            return None;
        }
        Some(Self {
            id,
            name: fields::string(value, Self::NAME),
            real_name: fields::string(value, Self::REAL_NAME),
            display_name: fields::string(value, Self::DISPLAY_NAME),
            email: fields::string(value, Self::EMAIL),
            title: fields::string(value, Self::TITLE),
            timezone: fields::string(value, Self::TIMEZONE),
            is_bot: fields::boolean(value, Self::BOT),
            deleted: fields::boolean(value, Self::DELETED),
        })
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = [&self.real_name, &self.display_name, &self.name]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or("(no name)");
        write!(f, "{} ({})", name, self.id)?;
        write_opt(f, "Username", &self.name)?;
        write_opt(f, "Display name", &self.display_name)?;
        write_opt(f, "Email", &self.email)?;
        write_opt(f, "Title", &self.title)?;
        write_opt(f, "Timezone", &self.timezone)?;
        if self.is_bot {
            write!(f, "\nBot: yes")?;
        }
        if self.deleted {
            write!(f, "\nDeactivated: yes")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Jira
// ---------------------------------------------------------------------------

/// Whether `key` looks like a Jira issue key (`PROJ-123`).
///
/// The project part is an uppercase letter followed by at least one
/// uppercase letter, digit or underscore; the number is all digits.
pub fn is_issue_key(key: &str) -> bool {
    let Some((project, number)) = key.rsplit_once('-') else {
        return false;
    };
    let mut project_chars = project.chars();
    let starts_with_letter = project_chars.next().is_some_and(|c| c.is_ascii_uppercase());
    starts_with_letter
        && project.len() >= 2
        && project_chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        && !number.is_empty()
        && number.chars().all(|c| c.is_ascii_digit())
}

/// A Jira issue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub issue_type: String,
    pub priority: String,
    pub assignee: String,
    pub reporter: String,
    pub labels: Vec<String>,
    pub description: String,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

impl Issue {
    const KEY: Candidates = &["key", "issue_key"];
    const SUMMARY: Candidates = &["fields.summary", "summary"];
    const STATUS: Candidates = &["fields.status.name", "status.name", "status"];
    const TYPE: Candidates = &["fields.issuetype.name", "issuetype.name", "issue_type", "type"];
    const PRIORITY: Candidates = &["fields.priority.name", "priority.name", "priority"];
    const ASSIGNEE: Candidates = &[
        "fields.assignee.displayName",
        "assignee.displayName",
        "fields.assignee.name",
        "assignee",
    ];
    const REPORTER: Candidates = &[
        "fields.reporter.displayName",
        "reporter.displayName",
        "reporter",
    ];
    const LABELS: Candidates = &["fields.labels", "labels"];
    const DESCRIPTION: Candidates = &["fields.description", "description"];
    const CREATED: Candidates = &["fields.created", "created"];
    const UPDATED: Candidates = &["fields.updated", "updated"];

    pub fn from_value(value: &Value) -> Option<Self> {
        let key = fields::string(value, Self::KEY);
        if key.is_empty() {
            return None;
        }
        Some(Self {
            key,
            summary: fields::string(value, Self::SUMMARY),
            status: fields::string(value, Self::STATUS),
            issue_type: fields::string(value, Self::TYPE),
            priority: fields::string(value, Self::PRIORITY),
            assignee: fields::string(value, Self::ASSIGNEE),
            reporter: fields::string(value, Self::REPORTER),
            labels: fields::string_list(value, Self::LABELS),
            description: fields::first(value, Self::DESCRIPTION)
                .map(flatten_document)
                .unwrap_or_default(),
            created: fields::timestamp(value, Self::CREATED),
            updated: fields::timestamp(value, Self::UPDATED),
        })
    }

    /// Parse one row of the CLI's plain list output (`KEY\tSUMMARY\tSTATUS\tASSIGNEE`).
    ///
    /// The CLI pads columns with runs of tabs, so empty cells are dropped.
    pub fn from_plain_row(line: &str) -> Option<Self> {
        let mut cells = line
            .split('\t')
            .map(str::trim)
            .filter(|cell| !cell.is_empty());
        let key = cells.next()?;
        if !is_issue_key(key) {
            return None;
        }
        Some(Self {
            key: key.to_string(),
            summary: cells.next().unwrap_or_default().to_string(),
            status: cells.next().unwrap_or_default().to_string(),
            assignee: cells.next().unwrap_or_default().to_string(),
            issue_type: String::new(),
            priority: String::new(),
            reporter: String::new(),
            labels: Vec::new(),
            description: String::new(),
            created: None,
            updated: None,
        })
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.summary)?;
        write_opt(f, "Status", &self.status)?;
        write_opt(f, "Type", &self.issue_type)?;
        write_opt(f, "Priority", &self.priority)?;
        let assignee = if self.assignee.is_empty() { "Unassigned" } else { &self.assignee };
        write!(f, "\nAssignee: {}", assignee)?;
        write_opt(f, "Reporter", &self.reporter)?;
        if !self.labels.is_empty() {
            write!(f, "\nLabels: {}", self.labels.join(", "))?;
        }
        write_time(f, "Created", &self.created)?;
        write_time(f, "Updated", &self.updated)?;
        if !self.description.is_empty() {
            write!(f, "\n\n{}", self.description)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Confluence
// ---------------------------------------------------------------------------

/// A Confluence page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub id: String,
    pub title: String,
    pub space_id: String,
    pub status: String,
    pub version: i64,
    pub author_id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub web_path: String,
    pub body: String,
}

impl Page {
    const ID: Candidates = &["id", "content.id"];
    const TITLE: Candidates = &["title", "content.title"];
    const SPACE_ID: Candidates = &["spaceId", "space.id", "space_id"];
    const STATUS: Candidates = &["status"];
    const VERSION: Candidates = &["version.number", "version"];
    const AUTHOR: Candidates = &["authorId", "version.authorId", "author_id"];
    const CREATED: Candidates = &["createdAt", "created_at", "version.createdAt"];
    const WEB_PATH: Candidates = &["_links.webui", "url"];
    const BODY: Candidates = &[
        "body.storage.value",
        "body.view.value",
        "body.export_view.value",
        "body.value",
    ];

    pub fn from_value(value: &Value) -> Option<Self> {
        let id = fields::string(value, Self::ID);
        if id.is_empty() {
            return None;
        }
        Some(Self {
            id,
            title: fields::string(value, Self::TITLE),
            space_id: fields::string(value, Self::SPACE_ID),
            status: fields::string(value, Self::STATUS),
            version: fields::integer(value, Self::VERSION),
            author_id: fields::string(value, Self::AUTHOR),
            created_at: fields::timestamp(value, Self::CREATED),
            web_path: fields::string(value, Self::WEB_PATH),
            body: fields::opt_string(value, Self::BODY)
                .map(|markup| strip_markup(&markup))
                .unwrap_or_default(),
        })
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (page {})", self.title, self.id)?;
        write_opt(f, "Space ID", &self.space_id)?;
        write_opt(f, "Status", &self.status)?;
        if self.version > 0 {
            write!(f, "\nVersion: {}", self.version)?;
        }
        write_time(f, "Created", &self.created_at)?;
        write_opt(f, "Link", &self.web_path)?;
        if !self.body.is_empty() {
            write!(f, "\n\n{}", self.body)?;
        }
        Ok(())
    }
}

/// A Confluence space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Space {
    pub id: String,
    pub key: String,
    pub name: String,
    pub space_type: String,
    pub status: String,
    pub description: String,
    pub homepage_id: String,
}

impl Space {
    const ID: Candidates = &["id"];
    const KEY: Candidates = &["key"];
    const NAME: Candidates = &["name"];
    const TYPE: Candidates = &["type"];
    const STATUS: Candidates = &["status"];
    const DESCRIPTION: Candidates = &["description.plain.value", "description.view.value", "description"];
    const HOMEPAGE: Candidates = &["homepageId", "homepage.id"];

    pub fn from_value(value: &Value) -> Option<Self> {
        let id = fields::string(value, Self::ID);
        let key = fields::string(value, Self::KEY);
        if id.is_empty() && key.is_empty() {
            return None;
        }
        Some(Self {
            id,
            key,
            name: fields::string(value, Self::NAME),
            space_type: fields::string(value, Self::TYPE),
            status: fields::string(value, Self::STATUS),
            description: fields::string(value, Self::DESCRIPTION),
            homepage_id: fields::string(value, Self::HOMEPAGE),
        })
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.key)?;
        write_opt(f, "ID", &self.id)?;
        write_opt(f, "Type", &self.space_type)?;
        write_opt(f, "Status", &self.status)?;
        write_opt(f, "Homepage", &self.homepage_id)?;
        write_opt(f, "Description", &self.description)
    }
}
