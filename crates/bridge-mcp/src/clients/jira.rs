//! Jira client.
//!
//! Drives the `jira` command line client. Listing uses the CLI's plain
//! tab-separated output; single issues are read as raw JSON.

use super::config::BridgeConfig;
use crate::credentials::{CredentialProvider, CredentialRef};
use crate::executor::{CliExecutor, CredentialEnv, OutboundRequest, RequestExecutor};
use crate::normalize::{normalize, Issue, RecordKind};
use crate::server::{McpServerError, McpServerResult};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Credential field holding the API token.
pub const TOKEN_FIELD: &str = "token";

/// Environment variable the CLI reads its token from.
pub const TOKEN_ENV: &str = "JIRA_API_TOKEN";

const LIST_COLUMNS: &str = "key,summary,status,assignee";

/// Filters for listing issues.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    pub project: Option<String>,
    pub jql: Option<String>,
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub limit: u32,
}

/// Jira client.
#[derive(Clone)]
pub struct JiraClient {
    executor: Arc<dyn RequestExecutor>,
    credential: CredentialRef,
}

impl JiraClient {
    /// Create a client over any executor.
    pub fn new(executor: Arc<dyn RequestExecutor>, credential_item: impl Into<String>) -> Self {
        Self {
            executor,
            credential: CredentialRef::new(credential_item, [TOKEN_FIELD]),
        }
    }

    /// Create a client running the configured CLI.
    pub fn from_config(config: &BridgeConfig, provider: Arc<dyn CredentialProvider>) -> Self {
        let executor = CliExecutor::new(&config.jira.cli_path, provider)
            .with_extra_path(config.extra_path.clone())
            .with_credential_env(CredentialEnv::new(TOKEN_FIELD, TOKEN_ENV));
        Self::new(Arc::new(executor), &config.jira.credential_item)
    }

    fn request(&self, subcommand: &str) -> OutboundRequest {
        OutboundRequest::new(subcommand, self.credential.clone())
    }

    /// List issues matching a project or JQL filter.
    #[instrument(skip(self))]
    pub async fn list_issues(&self, filter: &IssueFilter) -> McpServerResult<Vec<Issue>> {
        let request = self
            .request("issue list")
            .param_opt("project", filter.project.as_ref())
            .param_opt("jql", filter.jql.as_ref())
            .param_opt("status", filter.status.as_ref())
            .param_opt("assignee", filter.assignee.as_ref())
            .param("paginate", format!("0:{}", filter.limit))
            .param("plain", true)
            .param("no-headers", true)
            .param("no-truncate", true)
            .param("columns", LIST_COLUMNS);

        let output = self.executor.execute(request).await?.into_text();
        let issues: Vec<Issue> = output.lines().filter_map(Issue::from_plain_row).collect();
        debug!("Parsed {} issue row(s)", issues.len());
        Ok(issues)
    }

    /// Fetch one issue with all fields.
    #[instrument(skip(self))]
    pub async fn view_issue(&self, key: &str) -> McpServerResult<Issue> {
        let request = self.request("issue view").segment(key).param("raw", true);
        let raw = self.executor.execute(request).await?;

        normalize(raw, RecordKind::Issue)
            .and_then(|record| Issue::try_from(record).ok())
            .ok_or_else(|| McpServerError::UnrecognizedFormat(format!("issue {}", key)))
    }

    /// Set the story point estimate of an issue.
    #[instrument(skip(self))]
    pub async fn set_story_points(&self, key: &str, points: u32) -> McpServerResult<String> {
        let request = self
            .request("issue edit")
            .segment(key)
            .param("custom", format!("story-points={}", points))
            .param("no-input", true);
        Ok(self.executor.execute(request).await?.into_text())
    }

    /// Add a comment to an issue.
    #[instrument(skip(self, body))]
    pub async fn add_comment(&self, key: &str, body: &str) -> McpServerResult<String> {
        let request = self
            .request("issue comment add")
            .segment(key)
            .segment(body)
            .param("no-input", true);
        Ok(self.executor.execute(request).await?.into_text())
    }
}
