//! # Bridge MCP
//!
//! MCP (Model Context Protocol) adapters that expose Jira, Confluence, Slack
//! and Zoom to AI assistants as schema-described tools.
//!
//! ## Overview
//!
//! Each adapter is its own MCP server with the same pipeline:
//! - **Credentials**: secrets resolved per call from an external secret store
//! - **Executors**: one outbound call per operation (the `jira` CLI or HTTPS)
//! - **Normalization**: raw payloads mapped onto typed records through
//!   ordered candidate keys, tolerating vendor format drift
//! - **Tools**: argument validation, dispatch and text rendering
//!
//! ## MCP Protocol
//!
//! Requests arrive as newline-delimited JSON-RPC 2.0 on stdin. Supported
//! methods:
//! - `initialize`: Initialize the MCP session
//! - `ping`: Liveness check
//! - `tools/list`: List available tools
//! - `tools/call`: Execute a tool
//!
//! ## Available Tools
//!
//! ### Jira (via the `jira` CLI)
//! - `jira_list_issues`, `jira_search_issues`, `jira_view_issue`
//! - `jira_set_story_points`, `jira_add_comment`
//!
//! ### Confluence
//! - `confluence_list_spaces`, `confluence_get_page`
//! - `confluence_list_space_pages`, `confluence_search_pages`
//!
//! ### Slack
//! - `slack_list_channels`, `slack_read_channel`, `slack_search_messages`
//! - `slack_list_users`, `slack_get_user`
//!
//! ### Zoom
//! - `zoom_list_meetings`, `zoom_get_meeting`, `zoom_get_meeting_summary`
//! - `zoom_search_meetings`, `zoom_list_recordings`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bridge_mcp::{adapter_tools, serve_stdio, Adapter, BridgeConfig, McpServer};
//! use std::sync::Arc;
//! use tokio::io::BufReader;
//!
//! async fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BridgeConfig::from_env()?;
//!     let provider = Arc::new(config.credential_provider());
//!
//!     let server = McpServer::for_adapter(Adapter::Zoom);
//!     server
//!         .register_tools(adapter_tools(Adapter::Zoom, &config, provider)?)
//!         .await?;
//!
//!     serve_stdio(&server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
//!     Ok(())
//! }
//! ```

pub mod clients;
pub mod credentials;
pub mod executor;
pub mod normalize;
pub mod schema;
pub mod server;
pub mod tools;
pub mod transport;
pub mod types;

// Re-export main types
pub use server::{McpServer, McpServerError, McpServerResult, Tool, ToolContext};
pub use types::{
    Adapter, ContentBlock, McpError, McpRequest, McpResponse, RequestId, ServerCapabilities,
    ServerInfo, ToolCall, ToolCapabilities, ToolDefinition, ToolResult, PROTOCOL_VERSION,
};
pub use schema::{ParamSpec, ParamType, ToolSchema};

// Re-export the request pipeline
pub use credentials::{
    CommandCredentialProvider, CredentialError, CredentialProvider, CredentialRef, CredentialSet,
    Secret, StaticCredentialProvider,
};
pub use executor::{
    AuthScheme, BaseUrl, CliExecutor, CredentialEnv, ExecutorError, HttpExecutor, OutboundRequest,
    ParamValue, RawResponse, RequestExecutor,
};
pub use normalize::{normalize, normalize_list, normalize_nested, NormalizedRecord, RecordKind};

// Re-export adapters
pub use clients::{BridgeConfig, ConfigError, ConfluenceClient, JiraClient, SlackClient, ZoomClient};
pub use tools::{adapter_tools, confluence_tools, jira_tools, slack_tools, zoom_tools};
pub use transport::serve_stdio;
