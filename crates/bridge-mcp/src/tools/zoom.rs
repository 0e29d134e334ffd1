//! Zoom MCP tools
//!
//! Meetings, AI meeting summaries and cloud recordings. Searching combines
//! the meeting list with one summary fetch per listed meeting.

use super::{parse_args, require_digits};
use crate::clients::{MeetingMatch, ZoomClient};
use crate::schema::{ParamSpec, ToolSchema};
use crate::server::{McpServerError, McpServerResult, Tool, ToolContext};
use crate::types::{Adapter, ToolDefinition, ToolResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

const MEETING_TYPES: &[&str] = &["scheduled", "live", "upcoming", "previous_meetings"];
const DATE_FORMAT: &str = "%Y-%m-%d";

fn page_size_param() -> ParamSpec {
    ParamSpec::number("page_size", "Number of records to fetch")
        .default(30)
        .minimum(1)
        .maximum(300)
}

fn meeting_type_param(default: &str) -> ParamSpec {
    ParamSpec::string("type", "Meeting type")
        .default(default)
        .one_of(MEETING_TYPES)
}

fn parse_date(args: &Value, name: &str) -> McpServerResult<Option<NaiveDate>> {
    match args.get(name).and_then(Value::as_str) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Some)
            .map_err(|_| {
                McpServerError::InvalidParams(format!(
                    "{} must be a date in YYYY-MM-DD format, got '{}'",
                    name, s
                ))
            }),
    }
}

fn render_match(found: &MeetingMatch) -> String {
    match &found.summary {
        Some(summary) => format!("{}\n\n{}", found.meeting, summary),
        None => found.meeting.to_string(),
    }
}

/// Tool to list meetings.
pub struct ListMeetingsTool {
    client: Arc<ZoomClient>,
}

#[derive(Debug, Deserialize)]
struct ListMeetingsParams {
    #[serde(rename = "type")]
    meeting_type: String,
    page_size: u32,
}

#[async_trait]
impl Tool for ListMeetingsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("zoom_list_meetings", "List your Zoom meetings")
            .with_adapter(Adapter::Zoom)
            .with_schema(
                ToolSchema::new()
                    .param(meeting_type_param("scheduled"))
                    .param(page_size_param()),
            )
    }

    #[instrument(skip(self, args, _context), fields(tool = "zoom_list_meetings"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: ListMeetingsParams = parse_args(args)?;
        let meetings = self
            .client
            .list_meetings(&params.meeting_type, params.page_size)
            .await?;
        Ok(ToolResult::report(
            format!("Found {} {} meeting(s)", meetings.len(), params.meeting_type),
            meetings,
        ))
    }
}

/// Tool to show one meeting.
pub struct GetMeetingTool {
    client: Arc<ZoomClient>,
}

#[derive(Debug, Deserialize)]
struct MeetingIdParams {
    meeting_id: String,
}

#[async_trait]
impl Tool for GetMeetingTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("zoom_get_meeting", "Show the details of a Zoom meeting")
            .with_adapter(Adapter::Zoom)
            .with_schema(
                ToolSchema::new()
                    .param(ParamSpec::string("meeting_id", "Numeric meeting ID").required()),
            )
    }

    fn validate(&self, args: &Value) -> McpServerResult<()> {
        require_digits(args, "meeting_id")
    }

    #[instrument(skip(self, args, _context), fields(tool = "zoom_get_meeting"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: MeetingIdParams = parse_args(args)?;
        match self.client.get_meeting(&params.meeting_id).await {
            Ok(meeting) => Ok(ToolResult::text(meeting.to_string())),
            Err(McpServerError::UnrecognizedFormat(_)) => Ok(ToolResult::text(format!(
                "Found meeting {} but its details were not in a recognized format",
                params.meeting_id
            ))),
            Err(e) => Err(e),
        }
    }
}

/// Tool to read the AI summary of a past meeting.
pub struct GetMeetingSummaryTool {
    client: Arc<ZoomClient>,
}

#[async_trait]
impl Tool for GetMeetingSummaryTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "zoom_get_meeting_summary",
            "Read the AI-generated summary of a past Zoom meeting",
        )
        .with_adapter(Adapter::Zoom)
        .with_schema(ToolSchema::new().param(
            ParamSpec::string(
                "meeting_id",
                "Meeting ID or meeting UUID (use the UUID for a specific past occurrence)",
            )
            .required(),
        ))
    }

    #[instrument(skip(self, args, _context), fields(tool = "zoom_get_meeting_summary"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: MeetingIdParams = parse_args(args)?;
        match self.client.get_meeting_summary(&params.meeting_id).await {
            Ok(summary) => Ok(ToolResult::text(summary.to_string())),
            Err(McpServerError::UnrecognizedFormat(_)) => Ok(ToolResult::text(format!(
                "Found meeting {} but its summary format was not recognized",
                params.meeting_id
            ))),
            Err(e) => Err(e),
        }
    }
}

/// Tool to search meetings by topic and summary content.
pub struct SearchMeetingsTool {
    client: Arc<ZoomClient>,
}

#[derive(Debug, Deserialize)]
struct SearchMeetingsParams {
    query: String,
    #[serde(rename = "type")]
    meeting_type: String,
    page_size: u32,
}

#[async_trait]
impl Tool for SearchMeetingsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "zoom_search_meetings",
            "Find Zoom meetings whose topic or AI summary mentions the query",
        )
        .with_adapter(Adapter::Zoom)
        .with_schema(
            ToolSchema::new()
                .param(ParamSpec::string("query", "Text to look for (case-insensitive)").required())
                .param(meeting_type_param("previous_meetings"))
                .param(page_size_param()),
        )
    }

    #[instrument(skip(self, args, context), fields(tool = "zoom_search_meetings"))]
    async fn execute(&self, args: Value, context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: SearchMeetingsParams = parse_args(args)?;
        let search = self
            .client
            .search_meetings(&params.query, &params.meeting_type, params.page_size)
            .await?;

        info!(
            correlation_id = %context.correlation_id,
            "{} match(es) among {} meeting(s)",
            search.matches.len(),
            search.scanned
        );

        let mut result = ToolResult::report(
            format!(
                "Found {} meeting(s) matching '{}' (searched {})",
                search.matches.len(),
                params.query,
                search.scanned
            ),
            search.matches.iter().map(render_match),
        );
        if !search.failed.is_empty() {
            result = result.with_block(format!(
                "Could not check the summaries of {} meeting(s): {}",
                search.failed.len(),
                search.failed.join(", ")
            ));
        }
        Ok(result)
    }
}

/// Tool to list cloud recordings.
pub struct ListRecordingsTool {
    client: Arc<ZoomClient>,
}

#[derive(Debug, Deserialize)]
struct ListRecordingsParams {
    page_size: u32,
}

#[async_trait]
impl Tool for ListRecordingsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("zoom_list_recordings", "List Zoom cloud recordings in a date range")
            .with_adapter(Adapter::Zoom)
            .with_schema(
                ToolSchema::new()
                    .param(ParamSpec::string("from", "Start date, YYYY-MM-DD"))
                    .param(ParamSpec::string("to", "End date, YYYY-MM-DD"))
                    .param(page_size_param()),
            )
    }

    fn validate(&self, args: &Value) -> McpServerResult<()> {
        let from = parse_date(args, "from")?;
        let to = parse_date(args, "to")?;
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(McpServerError::InvalidParams(format!(
                    "from ({}) is after to ({})",
                    from, to
                )));
            }
        }
        Ok(())
    }

    #[instrument(skip(self, args, _context), fields(tool = "zoom_list_recordings"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let from = parse_date(&args, "from")?;
        let to = parse_date(&args, "to")?;
        let params: ListRecordingsParams = parse_args(args)?;

        let recordings = self
            .client
            .list_recordings(from, to, params.page_size)
            .await?;
        Ok(ToolResult::report(
            format!("Found {} recorded meeting(s)", recordings.len()),
            recordings,
        ))
    }
}

/// All Zoom tools, in discovery order.
pub fn zoom_tools(client: Arc<ZoomClient>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ListMeetingsTool { client: client.clone() }),
        Arc::new(GetMeetingTool { client: client.clone() }),
        Arc::new(GetMeetingSummaryTool { client: client.clone() }),
        Arc::new(SearchMeetingsTool { client: client.clone() }),
        Arc::new(ListRecordingsTool { client }),
    ]
}
