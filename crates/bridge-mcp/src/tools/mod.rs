//! MCP tools
//!
//! One module per adapter. Each exposes a `*_tools(client)` constructor
//! returning the adapter's tools in discovery order; [`adapter_tools`]
//! wires an adapter from configuration.

pub mod confluence;
pub mod jira;
pub mod slack;
pub mod zoom;

pub use confluence::confluence_tools;
pub use jira::jira_tools;
pub use slack::slack_tools;
pub use zoom::zoom_tools;

use crate::clients::{BridgeConfig, ConfluenceClient, JiraClient, SlackClient, ZoomClient};
use crate::credentials::CredentialProvider;
use crate::server::{McpServerError, McpServerResult, Tool};
use crate::types::Adapter;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Build the tool set of one adapter.
pub fn adapter_tools(
    adapter: Adapter,
    config: &BridgeConfig,
    provider: Arc<dyn CredentialProvider>,
) -> McpServerResult<Vec<Arc<dyn Tool>>> {
    Ok(match adapter {
        Adapter::Jira => jira_tools(Arc::new(JiraClient::from_config(config, provider))),
        Adapter::Confluence => {
            confluence_tools(Arc::new(ConfluenceClient::from_config(config, provider)?))
        }
        Adapter::Slack => slack_tools(Arc::new(SlackClient::from_config(config, provider)?)),
        Adapter::Zoom => zoom_tools(Arc::new(ZoomClient::from_config(config, provider)?)),
    })
}

/// Deserialize validated arguments into a tool's parameter struct.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> McpServerResult<T> {
    serde_json::from_value(args).map_err(|e| McpServerError::InvalidParams(e.to_string()))
}

/// Reject a string argument that is present but not all ASCII digits.
pub(crate) fn require_digits(args: &Value, name: &str) -> McpServerResult<()> {
    match args.get(name).and_then(Value::as_str) {
        Some(value) if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) => {
            Err(McpServerError::InvalidParams(format!(
                "{} must be numeric, got '{}'",
                name, value
            )))
        }
        _ => Ok(()),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingExecutor;
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn all_tools() -> Vec<Arc<dyn Tool>> {
        let executor = Arc::new(RecordingExecutor::default());
        let mut tools = jira_tools(Arc::new(JiraClient::new(executor.clone(), "Jira")));
        tools.extend(confluence_tools(Arc::new(ConfluenceClient::new(
            executor.clone(),
            crate::credentials::CredentialRef::new("Confluence", ["username", "token"]),
        ))));
        tools.extend(slack_tools(Arc::new(SlackClient::new(executor.clone(), "Slack"))));
        tools.extend(zoom_tools(Arc::new(ZoomClient::new(executor, "Zoom"))));
        tools
    }

    #[test]
    fn test_all_tools_count() {
        // 5 Jira + 4 Confluence + 5 Slack + 5 Zoom
        assert_eq!(all_tools().len(), 19);
    }

    #[test]
    fn test_all_tools_unique_names() {
        let mut names = HashSet::new();
        for tool in all_tools() {
            let def = tool.definition();
            assert!(names.insert(def.name.clone()), "Duplicate tool name: {}", def.name);
        }
    }

    #[test]
    fn test_tool_names_carry_adapter_prefix() {
        for tool in all_tools() {
            let def = tool.definition();
            let adapter = def.adapter.expect("every tool declares its adapter");
            assert!(def.name.starts_with(&format!("{}_", adapter)), "{}", def.name);
            assert!(!def.description.is_empty());
        }
    }

    #[test]
    fn test_adapter_tools_from_default_config() {
        let provider: Arc<dyn CredentialProvider> =
            Arc::new(crate::credentials::StaticCredentialProvider::new());
        for adapter in Adapter::ALL {
            let tools = adapter_tools(adapter, &BridgeConfig::default(), provider.clone()).unwrap();
            assert!(!tools.is_empty());
            assert!(tools.iter().all(|t| t.definition().adapter == Some(adapter)));
        }
    }

    #[test]
    fn test_require_digits() {
        assert!(require_digits(&json!({"page_id": "12345"}), "page_id").is_ok());
        assert!(require_digits(&json!({}), "page_id").is_ok());
        assert!(require_digits(&json!({"page_id": "12a"}), "page_id").is_err());
        assert!(require_digits(&json!({"page_id": "1/../2"}), "page_id").is_err());
    }
}
