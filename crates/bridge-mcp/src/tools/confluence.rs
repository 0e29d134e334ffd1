//! Confluence MCP tools

use super::{parse_args, require_digits};
use crate::clients::ConfluenceClient;
use crate::schema::{ParamSpec, ToolSchema};
use crate::server::{McpServerError, McpServerResult, Tool, ToolContext};
use crate::types::{Adapter, ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

fn limit_param(default: u64) -> ParamSpec {
    ParamSpec::number("limit", "Maximum number of results")
        .default(default)
        .minimum(1)
        .maximum(250)
}

/// Tool to list spaces.
pub struct ListSpacesTool {
    client: Arc<ConfluenceClient>,
}

#[derive(Debug, Deserialize)]
struct ListSpacesParams {
    limit: u32,
}

#[async_trait]
impl Tool for ListSpacesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("confluence_list_spaces", "List Confluence spaces")
            .with_adapter(Adapter::Confluence)
            .with_schema(ToolSchema::new().param(limit_param(25)))
    }

    #[instrument(skip(self, args, _context), fields(tool = "confluence_list_spaces"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: ListSpacesParams = parse_args(args)?;
        let spaces = self.client.list_spaces(params.limit).await?;
        Ok(ToolResult::report(
            format!("Found {} space(s)", spaces.len()),
            spaces,
        ))
    }
}

/// Tool to read a page.
pub struct GetPageTool {
    client: Arc<ConfluenceClient>,
}

#[derive(Debug, Deserialize)]
struct GetPageParams {
    page_id: String,
}

#[async_trait]
impl Tool for GetPageTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "confluence_get_page",
            "Read a Confluence page, with its body as plain text",
        )
        .with_adapter(Adapter::Confluence)
        .with_schema(
            ToolSchema::new().param(ParamSpec::string("page_id", "Numeric page ID").required()),
        )
    }

    fn validate(&self, args: &Value) -> McpServerResult<()> {
        require_digits(args, "page_id")
    }

    #[instrument(skip(self, args, _context), fields(tool = "confluence_get_page"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: GetPageParams = parse_args(args)?;
        match self.client.get_page(&params.page_id).await {
            Ok(page) => Ok(ToolResult::text(page.to_string())),
            Err(McpServerError::UnrecognizedFormat(_)) => Ok(ToolResult::text(format!(
                "Found page {} but its content was not in a recognized format",
                params.page_id
            ))),
            Err(e) => Err(e),
        }
    }
}

/// Tool to list the pages of a space.
pub struct ListSpacePagesTool {
    client: Arc<ConfluenceClient>,
}

#[derive(Debug, Deserialize)]
struct ListSpacePagesParams {
    space_id: String,
    limit: u32,
}

#[async_trait]
impl Tool for ListSpacePagesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("confluence_list_space_pages", "List the pages of a Confluence space")
            .with_adapter(Adapter::Confluence)
            .with_schema(
                ToolSchema::new()
                    .param(ParamSpec::string("space_id", "Numeric space ID").required())
                    .param(limit_param(25)),
            )
    }

    fn validate(&self, args: &Value) -> McpServerResult<()> {
        require_digits(args, "space_id")
    }

    #[instrument(skip(self, args, _context), fields(tool = "confluence_list_space_pages"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: ListSpacePagesParams = parse_args(args)?;
        let pages = self
            .client
            .list_space_pages(&params.space_id, params.limit)
            .await?;
        Ok(ToolResult::report(
            format!("Found {} page(s) in space {}", pages.len(), params.space_id),
            pages,
        ))
    }
}

/// Tool to find pages by title.
pub struct SearchPagesTool {
    client: Arc<ConfluenceClient>,
}

#[derive(Debug, Deserialize)]
struct SearchPagesParams {
    query: String,
    space_id: Option<String>,
    limit: u32,
}

#[async_trait]
impl Tool for SearchPagesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "confluence_search_pages",
            "Find recently modified Confluence pages whose title contains the query",
        )
        .with_adapter(Adapter::Confluence)
        .with_schema(
            ToolSchema::new()
                .param(ParamSpec::string("query", "Text to look for in page titles").required())
                .param(ParamSpec::string("space_id", "Only search this space (numeric ID)"))
                .param(limit_param(50)),
        )
    }

    fn validate(&self, args: &Value) -> McpServerResult<()> {
        require_digits(args, "space_id")
    }

    #[instrument(skip(self, args, _context), fields(tool = "confluence_search_pages"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: SearchPagesParams = parse_args(args)?;
        let pages = self
            .client
            .search_pages(&params.query, params.space_id.as_deref(), params.limit)
            .await?;
        Ok(ToolResult::report(
            format!("Found {} page(s) matching '{}'", pages.len(), params.query),
            pages,
        ))
    }
}

/// All Confluence tools, in discovery order.
pub fn confluence_tools(client: Arc<ConfluenceClient>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ListSpacesTool { client: client.clone() }),
        Arc::new(GetPageTool { client: client.clone() }),
        Arc::new(ListSpacePagesTool { client: client.clone() }),
        Arc::new(SearchPagesTool { client }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::CredentialRef;
    use crate::executor::{ParamValue, RawResponse};
    use crate::server::McpServer;
    use crate::tools::testing::RecordingExecutor;
    use serde_json::json;

    async fn server(responses: Vec<RawResponse>) -> (McpServer, Arc<RecordingExecutor>) {
        let executor = Arc::new(RecordingExecutor::replying(responses));
        let client = ConfluenceClient::new(
            executor.clone(),
            CredentialRef::new("Confluence", ["username", "token"]),
        );
        let server = McpServer::for_adapter(Adapter::Confluence);
        server
            .register_tools(confluence_tools(Arc::new(client)))
            .await
            .unwrap();
        (server, executor)
    }

    #[tokio::test]
    async fn test_page_id_must_be_numeric() {
        let (server, executor) = server(vec![]).await;
        let err = server
            .call_tool("confluence_get_page", json!({"page_id": "../spaces"}))
            .await
            .unwrap_err();
        assert!(matches!(err, McpServerError::InvalidParams(_)));
        assert_eq!(executor.calls(), 0);
    }

    #[tokio::test]
    async fn test_numeric_page_id_accepted_as_number() {
        let (server, executor) = server(vec![RawResponse::Json(json!({
            "id": "12345",
            "title": "Runbook",
            "body": {"storage": {"value": "<p>Restart <span>the</span> service</p>"}}
        }))])
        .await;

        let result = server
            .call_tool("confluence_get_page", json!({"page_id": 12345}))
            .await
            .unwrap();
        let text = result.texts().next().unwrap().to_string();
        assert!(text.starts_with("Runbook (page 12345)"));
        assert!(text.contains("Restart the service"));
        assert_eq!(executor.last().segments(), ["12345"]);
    }

    #[tokio::test]
    async fn test_get_page_degrades_on_unknown_shape() {
        let (server, _) = server(vec![RawResponse::Json(json!(["unexpected"]))]).await;
        let result = server
            .call_tool("confluence_get_page", json!({"page_id": "7"}))
            .await
            .unwrap();
        assert!(result.texts().next().unwrap().contains("not in a recognized format"));
    }

    #[tokio::test]
    async fn test_search_filters_titles() {
        let (server, executor) = server(vec![RawResponse::Json(json!({
            "results": [
                {"id": "1", "title": "Q3 Planning notes"},
                {"id": "2", "title": "Incident review"},
                {"id": "3", "title": "planning backlog"}
            ]
        }))])
        .await;

        let result = server
            .call_tool("confluence_search_pages", json!({"query": "PLANNING", "limit": 999}))
            .await
            .unwrap();
        let texts: Vec<_> = result.texts().collect();
        assert_eq!(texts[0], "Found 2 page(s) matching 'PLANNING'");
        assert_eq!(texts.len(), 3);
        assert_eq!(
            executor.last().get_param("limit"),
            Some(&ParamValue::Integer(250))
        );
        assert!(executor.last().get_param("space-id").is_none());
    }
}
