//! Slack Web API client.

use super::config::BridgeConfig;
use crate::credentials::{CredentialProvider, CredentialRef};
use crate::executor::{AuthScheme, BaseUrl, HttpExecutor, OutboundRequest, RawResponse, RequestExecutor};
use crate::normalize::{normalize_list, normalize_nested, Channel, Message, RecordKind, User};
use crate::server::{McpServerError, McpServerResult};
use std::sync::Arc;
use tracing::instrument;

/// Credential field holding the bot or user token.
pub const TOKEN_FIELD: &str = "token";

/// Slack client.
#[derive(Clone)]
pub struct SlackClient {
    executor: Arc<dyn RequestExecutor>,
    credential: CredentialRef,
}

impl SlackClient {
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
            .slack
            .base_url
            .clone()
            .ok_or_else(|| McpServerError::Internal("Slack API URL is not configured".into()))?;
        let executor = HttpExecutor::new(
            BaseUrl::Fixed(base),
            AuthScheme::bearer(TOKEN_FIELD),
            provider,
            config.timeout(),
        )?;
        Ok(Self::new(Arc::new(executor), &config.slack.credential_item))
    }

    fn request(&self, method: &str) -> OutboundRequest {
        OutboundRequest::new(method, self.credential.clone())
    }

    /// List conversations of the given types.
    #[instrument(skip(self))]
    pub async fn list_channels(&self, types: &str, exclude_archived: bool, limit: u32) -> McpServerResult<Vec<Channel>> {
        let request = self
            .request("conversations.list")
            .param("types", types)
            .param("exclude_archived", exclude_archived)
            .param("limit", limit);
        let raw = self.executor.execute(request).await?;
        Ok(normalize_list(raw, RecordKind::Channel, &["channels"])
            .into_iter()
            .filter_map(|record| Channel::try_from(record).ok())
            .collect())
    }

    /// Most recent messages of a channel, newest first.
    #[instrument(skip(self))]
    pub async fn read_channel(&self, channel: &str, limit: u32) -> McpServerResult<Vec<Message>> {
        let request = self
            .request("conversations.history")
            .param("channel", channel)
            .param("limit", limit);
        let raw = self.executor.execute(request).await?;
        Ok(messages(raw, &["messages"]))
    }

    /// Full-text message search, newest first.
    #[instrument(skip(self))]
    pub async fn search_messages(&self, query: &str, count: u32) -> McpServerResult<Vec<Message>> {
        let request = self
            .request("search.messages")
            .param("query", query)
            .param("count", count)
            .param("sort", "timestamp");
        let raw = self.executor.execute(request).await?;
        Ok(messages(raw, &["messages.matches"]))
    }

    /// List workspace members.
    #[instrument(skip(self))]
    pub async fn list_users(&self, limit: u32) -> McpServerResult<Vec<User>> {
        let raw = self
            .executor
            .execute(self.request("users.list").param("limit", limit))
            .await?;
        Ok(normalize_list(raw, RecordKind::User, &["members"])
            .into_iter()
            .filter_map(|record| User::try_from(record).ok())
            .collect())
    }

    /// Fetch one member's profile.
    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: &str) -> McpServerResult<User> {
        let raw = self
            .executor
            .execute(self.request("users.info").param("user", user_id))
            .await?;
        normalize_nested(raw, RecordKind::User, &["user"])
            .and_then(|record| User::try_from(record).ok())
            .ok_or_else(|| McpServerError::UnrecognizedFormat(format!("user {}", user_id)))
    }
}

fn messages(raw: RawResponse, keys: &[&str]) -> Vec<Message> {
    normalize_list(raw, RecordKind::Message, keys)
        .into_iter()
        .filter_map(|record| Message::try_from(record).ok())
        .collect()
}
