//! MCP server implementation
//!
//! This module provides the tool registry and dispatcher shared by every
//! adapter. Tools are kept in registration order; each call runs
//! lookup, schema validation, the tool's own checks, then execution.

use crate::clients::config::ConfigError;
use crate::credentials::CredentialError;
use crate::executor::ExecutorError;
use crate::types::*;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// MCP server error types.
#[derive(Debug, Error)]
pub enum McpServerError {
    /// No tool registered under this name
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Caller-supplied arguments violate the tool's schema
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Credentials could not be retrieved
    #[error("Credential unavailable: {0}")]
    CredentialUnavailable(String),

    /// The outbound call failed or the upstream reported a failure
    #[error("{0}")]
    Transport(String),

    /// The upstream response did not have the expected structure
    #[error("Unrecognized response format: {0}")]
    UnrecognizedFormat(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for MCP server operations.
pub type McpServerResult<T> = Result<T, McpServerError>;

impl McpServerError {
    /// JSON-RPC error object for this failure.
    pub fn to_mcp_error(&self) -> McpError {
        match self {
            McpServerError::InvalidParams(_) => McpError::invalid_params(self.to_string()),
            McpServerError::UnknownTool(_) => {
                McpError::new(McpError::METHOD_NOT_FOUND, self.to_string())
            }
            _ => McpError::internal_error(self.to_string()),
        }
    }
}

impl From<CredentialError> for McpServerError {
    fn from(err: CredentialError) -> Self {
        McpServerError::CredentialUnavailable(err.to_string())
    }
}

impl From<ExecutorError> for McpServerError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::Credential(inner) => inner.into(),
            ExecutorError::Transport { .. } => McpServerError::Transport(err.to_string()),
            ExecutorError::InvalidRequest { .. } => McpServerError::Internal(err.to_string()),
        }
    }
}

impl From<ConfigError> for McpServerError {
    fn from(err: ConfigError) -> Self {
        McpServerError::Internal(err.to_string())
    }
}

/// Trait for tool implementations.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> ToolDefinition;

    /// Adapter-specific argument checks, run after schema validation and
    /// before any outbound call.
    fn validate(&self, _args: &Value) -> McpServerResult<()> {
        Ok(())
    }

    /// Execute the tool. `args` is an object with defaults applied.
    async fn execute(&self, args: Value, context: &ToolContext) -> McpServerResult<ToolResult>;
}

/// Context for one tool execution.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Request correlation ID
    pub correlation_id: Uuid,

    /// Adapter the tool belongs to
    pub adapter: Option<Adapter>,
}

impl ToolContext {
    /// Fresh context with a new correlation ID.
    pub fn new(adapter: Option<Adapter>) -> Self {
        Self {
            correlation_id: Uuid::now_v7(),
            adapter,
        }
    }
}

/// Tool registry and JSON-RPC dispatcher.
pub struct McpServer {
    /// Server info
    info: ServerInfo,

    /// Server capabilities
    capabilities: ServerCapabilities,

    /// Registered tools, in registration order
    tools: RwLock<Vec<Arc<dyn Tool>>>,
}

impl McpServer {
    /// Create a new MCP server.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: ServerInfo {
                name: name.into(),
                version: version.into(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolCapabilities { list_changed: false }),
            },
            tools: RwLock::new(Vec::new()),
        }
    }

    /// Create a server named after an adapter.
    pub fn for_adapter(adapter: Adapter) -> Self {
        Self::new(format!("mcp-bridge-{}", adapter), env!("CARGO_PKG_VERSION"))
    }

    /// Register a tool. Names must be unique.
    pub async fn register_tool(&self, tool: Arc<dyn Tool>) -> McpServerResult<()> {
        let name = tool.definition().name;
        let mut tools = self.tools.write().await;

        if tools.iter().any(|t| t.definition().name == name) {
            return Err(McpServerError::Internal(format!(
                "tool '{}' registered twice",
                name
            )));
        }

        debug!("Registered tool {}", name);
        tools.push(tool);
        Ok(())
    }

    /// Register multiple tools.
    pub async fn register_tools(&self, tools: Vec<Arc<dyn Tool>>) -> McpServerResult<()> {
        for tool in tools {
            self.register_tool(tool).await?;
        }
        Ok(())
    }

    /// Get all tool definitions, in registration order.
    pub async fn list_tools(&self) -> Vec<ToolDefinition> {
        let tools = self.tools.read().await;
        tools.iter().map(|t| t.definition()).collect()
    }

    async fn find_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let tools = self.tools.read().await;
        tools.iter().find(|t| t.definition().name == name).cloned()
    }

    /// Execute a tool.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> McpServerResult<ToolResult> {
        let tool = self
            .find_tool(name)
            .await
            .ok_or_else(|| McpServerError::UnknownTool(name.to_string()))?;

        let definition = tool.definition();
        let context = ToolContext::new(definition.adapter);
        let span = info_span!(
            "tool_call",
            tool = %name,
            correlation_id = %context.correlation_id
        );

        async {
            let args = definition
                .schema
                .apply(arguments)
                .map_err(McpServerError::InvalidParams)?;
            let args = Value::Object(args);
            tool.validate(&args)?;

            let started = Instant::now();
            let result = tool.execute(args, &context).await;
            match &result {
                Ok(_) => info!("Tool completed in {:?}", started.elapsed()),
                Err(e) => warn!("Tool failed after {:?}: {}", started.elapsed(), e),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Handle an MCP request. Notifications produce no response.
    pub async fn handle_request(&self, request: McpRequest) -> Option<McpResponse> {
        if request.is_notification() {
            debug!("Notification {}", request.method);
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "ping" => McpResponse::success(request.id, serde_json::json!({})),
            "tools/list" => self.handle_tools_list(request.id).await,
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            _ => McpResponse::error(request.id, McpError::method_not_found(&request.method)),
        };
        Some(response)
    }

    fn handle_initialize(&self, id: RequestId) -> McpResponse {
        McpResponse::success(
            id,
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": self.capabilities,
                "serverInfo": self.info
            }),
        )
    }

    async fn handle_tools_list(&self, id: RequestId) -> McpResponse {
        let tools = self.list_tools().await;
        McpResponse::success(id, serde_json::json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, id: RequestId, params: Option<Value>) -> McpResponse {
        let params = match params {
            Some(p) => p,
            None => return McpResponse::error(id, McpError::invalid_params("Missing params")),
        };

        let call: ToolCall = match serde_json::from_value(params) {
            Ok(c) => c,
            Err(e) => return McpResponse::error(id, McpError::invalid_params(e.to_string())),
        };

        match self.call_tool(&call.name, call.arguments).await {
            Ok(result) => match serde_json::to_value(result) {
                Ok(value) => McpResponse::success(id, value),
                Err(e) => McpResponse::error(id, McpError::internal_error(e.to_string())),
            },
            Err(e) => McpResponse::error(id, e.to_mcp_error()),
        }
    }

    /// Get server info.
    pub fn info(&self) -> &ServerInfo {
        &self.info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ParamSpec, ToolSchema};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTool {
        name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new(self.name, "Counts its calls")
                .with_schema(
                    ToolSchema::new()
                        .param(ParamSpec::string("query", "Search text").required())
                        .param(ParamSpec::number("limit", "Max results").default(20).maximum(100)),
                )
                .with_adapter(Adapter::Slack)
        }

        fn validate(&self, args: &Value) -> McpServerResult<()> {
            if args["query"] == "forbidden" {
                return Err(McpServerError::InvalidParams("query not allowed".into()));
            }
            Ok(())
        }

        async fn execute(&self, args: Value, context: &ToolContext) -> McpServerResult<ToolResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(context.adapter, Some(Adapter::Slack));
            Ok(ToolResult::text(format!("limit={}", args["limit"])))
        }
    }

    async fn server_with_tool() -> (McpServer, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let server = McpServer::for_adapter(Adapter::Slack);
        server
            .register_tool(Arc::new(CountingTool {
                name: "count",
                calls: calls.clone(),
            }))
            .await
            .unwrap();
        (server, calls)
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = McpServer::for_adapter(Adapter::Zoom);
        assert_eq!(server.info().name, "mcp-bridge-zoom");
    }

    #[tokio::test]
    async fn test_registration_order_and_duplicates() {
        let (server, calls) = server_with_tool().await;
        server
            .register_tool(Arc::new(CountingTool {
                name: "another",
                calls: calls.clone(),
            }))
            .await
            .unwrap();

        let names: Vec<_> = server.list_tools().await.into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["count", "another"]);

        let err = server
            .register_tool(Arc::new(CountingTool { name: "count", calls }))
            .await
            .unwrap_err();
        assert!(matches!(err, McpServerError::Internal(_)));
    }

    #[tokio::test]
    async fn test_call_tool_applies_schema() {
        let (server, calls) = server_with_tool().await;

        let result = server.call_tool("count", json!({"query": "q"})).await.unwrap();
        assert_eq!(result.texts().collect::<Vec<_>>(), vec!["limit=20"]);

        let result = server
            .call_tool("count", json!({"query": "q", "limit": 500}))
            .await
            .unwrap();
        assert_eq!(result.texts().collect::<Vec<_>>(), vec!["limit=100"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalid_params_never_execute() {
        let (server, calls) = server_with_tool().await;

        let err = server.call_tool("count", json!({})).await.unwrap_err();
        assert!(matches!(err, McpServerError::InvalidParams(_)));

        let err = server
            .call_tool("count", json!({"query": "forbidden"}))
            .await
            .unwrap_err();
        assert!(matches!(err, McpServerError::InvalidParams(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (server, calls) = server_with_tool().await;
        let err = server.call_tool("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, McpServerError::UnknownTool(_)));
        assert_eq!(err.to_mcp_error().code, McpError::METHOD_NOT_FOUND);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(
            McpServerError::InvalidParams("x".into()).to_mcp_error().code,
            McpError::INVALID_PARAMS
        );
        for err in [
            McpServerError::CredentialUnavailable("x".into()),
            McpServerError::Transport("x".into()),
            McpServerError::UnrecognizedFormat("x".into()),
            McpServerError::Internal("x".into()),
        ] {
            assert_eq!(err.to_mcp_error().code, McpError::INTERNAL_ERROR);
        }
    }

    #[test]
    fn test_executor_error_conversion() {
        let err: McpServerError = ExecutorError::Credential(CredentialError::Unavailable {
            item: "Zoom".into(),
            reason: "empty value for field 'access token'".into(),
        })
        .into();
        assert!(matches!(err, McpServerError::CredentialUnavailable(_)));

        let err: McpServerError = ExecutorError::Transport {
            target: "conversations.list".into(),
            reason: "not_authed".into(),
        }
        .into();
        assert_eq!(err.to_string(), "conversations.list failed: not_authed");
    }

    #[tokio::test]
    async fn test_handle_request() {
        let (server, _) = server_with_tool().await;

        let resp = server
            .handle_request(McpRequest::new("1", "initialize"))
            .await
            .unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "mcp-bridge-slack");

        let resp = server
            .handle_request(McpRequest::new("2", "tools/list"))
            .await
            .unwrap();
        assert_eq!(resp.result.unwrap()["tools"][0]["inputSchema"]["required"], json!(["query"]));

        let notification: McpRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert!(server.handle_request(notification).await.is_none());

        let resp = server
            .handle_request(McpRequest::new("3", "resources/list"))
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, McpError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tools_call_error_codes() {
        let (server, _) = server_with_tool().await;

        let resp = server
            .handle_request(
                McpRequest::new("4", "tools/call")
                    .with_params(json!({"name": "count", "arguments": {"limit": 3}})),
            )
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, McpError::INVALID_PARAMS);

        let resp = server
            .handle_request(McpRequest::new("5", "tools/call"))
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, McpError::INVALID_PARAMS);

        let resp = server
            .handle_request(
                McpRequest::new("6", "tools/call")
                    .with_params(json!({"name": "count", "arguments": {"query": "q"}})),
            )
            .await
            .unwrap();
        assert_eq!(resp.result.unwrap()["content"][0]["type"], "text");
    }
}
