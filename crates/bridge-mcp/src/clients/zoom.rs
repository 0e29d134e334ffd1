//! Zoom REST API client.

use super::config::BridgeConfig;
use crate::credentials::{CredentialProvider, CredentialRef};
use crate::executor::{AuthScheme, BaseUrl, HttpExecutor, OutboundRequest, RawResponse, RequestExecutor};
use crate::normalize::{normalize, normalize_list, Meeting, MeetingSummary, RecordKind};
use crate::server::{McpServerError, McpServerResult};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::form_urlencoded;

/// Credential field holding the OAuth access token.
pub const TOKEN_FIELD: &str = "access token";

const MEETINGS: &[&str] = &["meetings"];

/// Prepare a meeting UUID for use as a path segment.
///
/// UUIDs starting with `/` or containing `//` must reach Zoom
/// double-encoded. Path segments are encoded once when the URL is built,
/// so those UUIDs are encoded here one extra time. Everything else is
/// returned unchanged.
pub fn encode_meeting_uuid(uuid: &str) -> String {
    if uuid.starts_with('/') || uuid.contains("//") {
        form_urlencoded::byte_serialize(uuid.as_bytes()).collect()
    } else {
        uuid.to_string()
    }
}

/// A meeting selected by a search, with its summary when one was fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct MeetingMatch {
    pub meeting: Meeting,
    pub summary: Option<MeetingSummary>,
}

/// Outcome of a meeting search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeetingSearch {
    /// Matching meetings, in listing order.
    pub matches: Vec<MeetingMatch>,
    /// Number of meetings examined.
    pub scanned: usize,
    /// Meetings whose summary could not be fetched.
    pub failed: Vec<String>,
}

/// Zoom client.
#[derive(Clone)]
pub struct ZoomClient {
    executor: Arc<dyn RequestExecutor>,
    credential: CredentialRef,
}

impl ZoomClient {
    /// Create a client over any executor.
    pub fn new(executor: Arc<dyn RequestExecutor>, credential_item: impl Into<String>) -> Self {
        Self {
            executor,
            credential: CredentialRef::new(credential_item, [TOKEN_FIELD]),
        }
    }

    /// Create an HTTP client from configuration.
    pub fn from_config(config: &BridgeConfig, provider: Arc<dyn CredentialProvider>) -> McpServerResult<Self> {
        let base = config
            .zoom
            .base_url
            .clone()
            .ok_or_else(|| McpServerError::Internal("Zoom API URL is not configured".into()))?;
        let executor = HttpExecutor::new(
            BaseUrl::Fixed(base),
            AuthScheme::bearer(TOKEN_FIELD),
            provider,
            config.timeout(),
        )?;
        Ok(Self::new(Arc::new(executor), &config.zoom.credential_item))
    }

    fn request(&self, path: &str) -> OutboundRequest {
        OutboundRequest::new(path, self.credential.clone())
    }

    /// List the current user's meetings of a given type.
    #[instrument(skip(self))]
    pub async fn list_meetings(&self, meeting_type: &str, page_size: u32) -> McpServerResult<Vec<Meeting>> {
        let request = self
            .request("/users/me/meetings")
            .param("type", meeting_type)
            .param("page_size", page_size);
        let raw = self.executor.execute(request).await?;
        Ok(meetings(raw))
    }

    /// Fetch one meeting by numeric id.
    #[instrument(skip(self))]
    pub async fn get_meeting(&self, meeting_id: &str) -> McpServerResult<Meeting> {
        let raw = self
            .executor
            .execute(self.request("/meetings").segment(meeting_id))
            .await?;
        normalize(raw, RecordKind::Meeting)
            .and_then(|record| Meeting::try_from(record).ok())
            .ok_or_else(|| McpServerError::UnrecognizedFormat(format!("meeting {}", meeting_id)))
    }

    /// Fetch the AI summary of a past meeting (numeric id or UUID).
    #[instrument(skip(self))]
    pub async fn get_meeting_summary(&self, meeting: &str) -> McpServerResult<MeetingSummary> {
        let request = self
            .request("/meetings")
            .segment(encode_meeting_uuid(meeting))
            .segment("meeting_summary");
        let raw = self.executor.execute(request).await?;
        normalize(raw, RecordKind::MeetingSummary)
            .and_then(|record| MeetingSummary::try_from(record).ok())
            .ok_or_else(|| McpServerError::UnrecognizedFormat(format!("summary of meeting {}", meeting)))
    }

    /// Meetings whose topic or summary contains `query` (case-insensitive).
    ///
    /// Summaries are fetched one at a time in listing order. A failed fetch
    /// only affects its own meeting, which can then match on topic alone.
    #[instrument(skip(self))]
    pub async fn search_meetings(&self, query: &str, meeting_type: &str, page_size: u32) -> McpServerResult<MeetingSearch> {
        let listed = self.list_meetings(meeting_type, page_size).await?;
        let needle = query.to_lowercase();
        let mut search = MeetingSearch {
            scanned: listed.len(),
            ..MeetingSearch::default()
        };

        for meeting in listed {
            let summary = match self.get_meeting_summary(meeting.summary_key()).await {
                Ok(summary) => Some(summary),
                Err(McpServerError::UnrecognizedFormat(_)) => {
                    debug!(meeting_id = %meeting.id, "Summary format not recognized");
                    None
                }
                Err(e) => {
                    warn!(meeting_id = %meeting.id, "Summary fetch failed: {}", e);
                    search.failed.push(meeting.id.clone());
                    None
                }
            };

            let topic_match = meeting.topic.to_lowercase().contains(&needle);
            let summary_match = summary
                .as_ref()
                .map(|s| s.content_text().to_lowercase().contains(&needle))
                .unwrap_or(false);

            if topic_match || summary_match {
                search.matches.push(MeetingMatch { meeting, summary });
            }
        }

        debug!(
            "{} of {} meeting(s) match, {} summary fetch(es) failed",
            search.matches.len(),
            search.scanned,
            search.failed.len()
        );
        Ok(search)
    }

    /// Cloud recordings in a date range.
    #[instrument(skip(self))]
    pub async fn list_recordings(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        page_size: u32,
    ) -> McpServerResult<Vec<Meeting>> {
        let request = self
            .request("/users/me/recordings")
            .param_opt("from", from.map(|d| d.format("%Y-%m-%d").to_string()))
            .param_opt("to", to.map(|d| d.format("%Y-%m-%d").to_string()))
            .param("page_size", page_size);
        let raw = self.executor.execute(request).await?;
        Ok(meetings(raw))
    }
}

fn meetings(raw: RawResponse) -> Vec<Meeting> {
    normalize_list(raw, RecordKind::Meeting, MEETINGS)
        .into_iter()
        .filter_map(|record| Meeting::try_from(record).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_meeting_uuid() {
        assert_eq!(encode_meeting_uuid("4444AAAiAAAAAiAiAiiAii=="), "4444AAAiAAAAAiAiAiiAii==");
        assert_eq!(encode_meeting_uuid("85746065432"), "85746065432");
        assert_eq!(encode_meeting_uuid("/ajXp112QmuoKj4854875=="), "%2FajXp112QmuoKj4854875%3D%3D");
        assert_eq!(encode_meeting_uuid("ab//cd"), "ab%2F%2Fcd");
    }
}
