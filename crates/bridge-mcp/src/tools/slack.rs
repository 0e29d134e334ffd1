//! Slack MCP tools

use super::parse_args;
use crate::clients::SlackClient;
use crate::schema::{ParamSpec, ToolSchema};
use crate::server::{McpServerError, McpServerResult, Tool, ToolContext};
use crate::types::{Adapter, ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Tool to list channels.
pub struct ListChannelsTool {
    client: Arc<SlackClient>,
}

#[derive(Debug, Deserialize)]
struct ListChannelsParams {
    types: String,
    exclude_archived: bool,
    limit: u32,
}

#[async_trait]
impl Tool for ListChannelsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("slack_list_channels", "List Slack channels in the workspace")
            .with_adapter(Adapter::Slack)
            .with_schema(
                ToolSchema::new()
                    .param(
                        ParamSpec::string(
                            "types",
                            "Comma-separated conversation types: public_channel, private_channel, mpim, im",
                        )
                        .default("public_channel"),
                    )
                    .param(
                        ParamSpec::boolean("exclude_archived", "Leave out archived channels")
                            .default(true),
                    )
                    .param(
                        ParamSpec::number("limit", "Maximum number of channels")
                            .default(100)
                            .minimum(1)
                            .maximum(1000),
                    ),
            )
    }

    #[instrument(skip(self, args, _context), fields(tool = "slack_list_channels"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: ListChannelsParams = parse_args(args)?;
        let channels = self
            .client
            .list_channels(&params.types, params.exclude_archived, params.limit)
            .await?;
        Ok(ToolResult::report(
            format!("Found {} channel(s)", channels.len()),
            channels,
        ))
    }
}

/// Tool to read recent messages of a channel.
pub struct ReadChannelTool {
    client: Arc<SlackClient>,
}

#[derive(Debug, Deserialize)]
struct ReadChannelParams {
    channel: String,
    limit: u32,
}

#[async_trait]
impl Tool for ReadChannelTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("slack_read_channel", "Read the most recent messages of a Slack channel")
            .with_adapter(Adapter::Slack)
            .with_schema(
                ToolSchema::new()
                    .param(ParamSpec::string("channel", "Channel ID, e.g. C0123456789").required())
                    .param(
                        ParamSpec::number("limit", "Number of messages")
                            .default(20)
                            .minimum(1)
                            .maximum(200),
                    ),
            )
    }

    fn validate(&self, args: &Value) -> McpServerResult<()> {
        let channel = args["channel"].as_str().unwrap_or_default();
        if channel.starts_with('#') {
            return Err(McpServerError::InvalidParams(format!(
                "channel must be a channel ID, not a name ({})",
                channel
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, args, _context), fields(tool = "slack_read_channel"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: ReadChannelParams = parse_args(args)?;
        let messages = self
            .client
            .read_channel(&params.channel, params.limit)
            .await?;
        Ok(ToolResult::report(
            format!("Found {} message(s) in {}", messages.len(), params.channel),
            messages,
        ))
    }
}

/// Tool to search messages.
pub struct SearchMessagesTool {
    client: Arc<SlackClient>,
}

#[derive(Debug, Deserialize)]
struct SearchMessagesParams {
    query: String,
    count: u32,
}

#[async_trait]
impl Tool for SearchMessagesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "slack_search_messages",
            "Search Slack messages, newest first (supports Slack search modifiers like in:#channel)",
        )
        .with_adapter(Adapter::Slack)
        .with_schema(
            ToolSchema::new()
                .param(ParamSpec::string("query", "Search query").required())
                .param(
                    ParamSpec::number("count", "Number of results")
                        .default(20)
                        .minimum(1)
                        .maximum(100),
                ),
        )
    }

    #[instrument(skip(self, args, _context), fields(tool = "slack_search_messages"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: SearchMessagesParams = parse_args(args)?;
        let messages = self
            .client
            .search_messages(&params.query, params.count)
            .await?;
        Ok(ToolResult::report(
            format!("Found {} message(s) matching '{}'", messages.len(), params.query),
            messages,
        ))
    }
}

/// Tool to list workspace members.
pub struct ListUsersTool {
    client: Arc<SlackClient>,
}

#[derive(Debug, Deserialize)]
struct ListUsersParams {
    limit: u32,
}

#[async_trait]
impl Tool for ListUsersTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("slack_list_users", "List members of the Slack workspace")
            .with_adapter(Adapter::Slack)
            .with_schema(
                ToolSchema::new().param(
                    ParamSpec::number("limit", "Maximum number of users")
                        .default(100)
                        .minimum(1)
                        .maximum(1000),
                ),
            )
    }

    #[instrument(skip(self, args, _context), fields(tool = "slack_list_users"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: ListUsersParams = parse_args(args)?;
        let users = self.client.list_users(params.limit).await?;
        Ok(ToolResult::report(format!("Found {} user(s)", users.len()), users))
    }
}

/// Tool to show one member's profile.
pub struct GetUserTool {
    client: Arc<SlackClient>,
}

#[derive(Debug, Deserialize)]
struct GetUserParams {
    user_id: String,
}

#[async_trait]
impl Tool for GetUserTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("slack_get_user", "Show a Slack member's profile")
            .with_adapter(Adapter::Slack)
            .with_schema(
                ToolSchema::new()
                    .param(ParamSpec::string("user_id", "User ID, e.g. U0123456789").required()),
            )
    }

    #[instrument(skip(self, args, _context), fields(tool = "slack_get_user"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: GetUserParams = parse_args(args)?;
        match self.client.get_user(&params.user_id).await {
            Ok(user) => Ok(ToolResult::text(user.to_string())),
            Err(McpServerError::UnrecognizedFormat(_)) => Ok(ToolResult::text(format!(
                "Found user {} but the profile was not in a recognized format",
                params.user_id
            ))),
            Err(e) => Err(e),
        }
    }
}

/// All Slack tools, in discovery order.
pub fn slack_tools(client: Arc<SlackClient>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ListChannelsTool { client: client.clone() }),
        Arc::new(ReadChannelTool { client: client.clone() }),
        Arc::new(SearchMessagesTool { client: client.clone() }),
        Arc::new(ListUsersTool { client: client.clone() }),
        Arc::new(GetUserTool { client }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ParamValue, RawResponse};
    use crate::server::McpServer;
    use crate::tools::testing::RecordingExecutor;
    use serde_json::json;

    async fn server(responses: Vec<RawResponse>) -> (McpServer, Arc<RecordingExecutor>) {
        let executor = Arc::new(RecordingExecutor::replying(responses));
        let server = McpServer::for_adapter(Adapter::Slack);
        server
            .register_tools(slack_tools(Arc::new(SlackClient::new(executor.clone(), "Slack"))))
            .await
            .unwrap();
        (server, executor)
    }

    #[tokio::test]
    async fn test_list_channels_defaults() {
        let (server, executor) = server(vec![RawResponse::Json(json!({
            "ok": true,
            "channels": [
                {"id": "C1", "name": "general", "num_members": 40},
                {"id": "C2", "name": "random", "is_archived": true}
            ]
        }))])
        .await;

        let result = server.call_tool("slack_list_channels", json!({})).await.unwrap();
        let texts: Vec<_> = result.texts().collect();
        assert_eq!(texts[0], "Found 2 channel(s)");
        assert!(texts[1].starts_with("#general (C1)"));

        let request = executor.last();
        assert_eq!(request.target(), "conversations.list");
        assert_eq!(request.get_param("types"), Some(&ParamValue::Text("public_channel".into())));
        assert_eq!(request.get_param("exclude_archived"), Some(&ParamValue::Flag(true)));
        assert_eq!(request.get_param("limit"), Some(&ParamValue::Integer(100)));
    }

    #[tokio::test]
    async fn test_read_channel_rejects_names() {
        let (server, executor) = server(vec![]).await;
        let err = server
            .call_tool("slack_read_channel", json!({"channel": "#general"}))
            .await
            .unwrap_err();
        assert!(matches!(err, McpServerError::InvalidParams(_)));
        assert_eq!(executor.calls(), 0);
    }

    #[tokio::test]
    async fn test_search_messages_reads_nested_matches() {
        let (server, executor) = server(vec![RawResponse::Json(json!({
            "ok": true,
            "messages": {
                "total": 1,
                "matches": [{
                    "ts": "1718000000.000100",
                    "username": "dana",
                    "text": "planning moved to Thursday",
                    "channel": {"id": "C1", "name": "general"}
                }]
            }
        }))])
        .await;

        let result = server
            .call_tool("slack_search_messages", json!({"query": "planning", "count": 500}))
            .await
            .unwrap();
        let texts: Vec<_> = result.texts().collect();
        assert_eq!(texts[0], "Found 1 message(s) matching 'planning'");
        assert!(texts[1].contains("planning moved to Thursday"));
        assert_eq!(executor.last().get_param("count"), Some(&ParamValue::Integer(100)));
    }

    #[tokio::test]
    async fn test_get_user_requires_id() {
        let (server, executor) = server(vec![]).await;
        let err = server.call_tool("slack_get_user", json!({})).await.unwrap_err();
        assert!(matches!(err, McpServerError::InvalidParams(_)));
        assert_eq!(executor.calls(), 0);
    }
}
