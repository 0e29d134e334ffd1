//! Jira MCP tools
//!
//! Issue listing, search, inspection and two small edits (story points and
//! comments), all through the `jira` command line client.

use super::parse_args;
use crate::clients::{IssueFilter, JiraClient};
use crate::normalize::{is_issue_key, Issue};
use crate::schema::{ParamSpec, ToolSchema};
use crate::server::{McpServerError, McpServerResult, Tool, ToolContext};
use crate::types::{Adapter, ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Story point values accepted by `jira_set_story_points`.
pub const STORY_POINTS: [u32; 10] = [1, 2, 3, 5, 8, 13, 21, 34, 55, 89];

fn limit_param() -> ParamSpec {
    ParamSpec::number("limit", "Maximum number of issues to return")
        .default(25)
        .minimum(1)
        .maximum(100)
}

fn issue_key_param() -> ParamSpec {
    ParamSpec::string("issue_key", "Issue key, e.g. PROJ-123").required()
}

fn check_issue_key(args: &Value) -> McpServerResult<()> {
    let key = args["issue_key"].as_str().unwrap_or_default();
    if is_issue_key(key) {
        Ok(())
    } else {
        Err(McpServerError::InvalidParams(format!(
            "'{}' is not a valid issue key (expected e.g. PROJ-123)",
            key
        )))
    }
}

fn issue_report(header: String, issues: Vec<Issue>) -> ToolResult {
    ToolResult::report(header, issues)
}

/// Tool to list issues of a project.
pub struct ListIssuesTool {
    client: Arc<JiraClient>,
}

#[derive(Debug, Deserialize)]
struct ListIssuesParams {
    project: String,
    status: Option<String>,
    assignee: Option<String>,
    limit: u32,
}

#[async_trait]
impl Tool for ListIssuesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "jira_list_issues",
            "List issues in a Jira project, optionally filtered by status or assignee",
        )
        .with_adapter(Adapter::Jira)
        .with_schema(
            ToolSchema::new()
                .param(ParamSpec::string("project", "Project key, e.g. PROJ").required())
                .param(ParamSpec::string("status", "Only issues in this status, e.g. \"In Progress\""))
                .param(ParamSpec::string("assignee", "Only issues assigned to this user (email or name)"))
                .param(limit_param()),
        )
    }

    #[instrument(skip(self, args, context), fields(tool = "jira_list_issues"))]
    async fn execute(&self, args: Value, context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: ListIssuesParams = parse_args(args)?;
        debug!("Listing issues of {} ({})", params.project, context.correlation_id);

        let filter = IssueFilter {
            project: Some(params.project.clone()),
            status: params.status,
            assignee: params.assignee,
            limit: params.limit,
            ..IssueFilter::default()
        };
        let issues = self.client.list_issues(&filter).await?;

        Ok(issue_report(
            format!("Found {} issue(s) in {}", issues.len(), params.project),
            issues,
        ))
    }
}

/// Tool to search issues with JQL.
pub struct SearchIssuesTool {
    client: Arc<JiraClient>,
}

#[derive(Debug, Deserialize)]
struct SearchIssuesParams {
    jql: String,
    limit: u32,
}

#[async_trait]
impl Tool for SearchIssuesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("jira_search_issues", "Search Jira issues with a JQL query")
            .with_adapter(Adapter::Jira)
            .with_schema(
                ToolSchema::new()
                    .param(
                        ParamSpec::string("jql", "JQL query, e.g. \"project = PROJ AND status = Done\"")
                            .required(),
                    )
                    .param(limit_param()),
            )
    }

    #[instrument(skip(self, args, _context), fields(tool = "jira_search_issues"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: SearchIssuesParams = parse_args(args)?;

        let filter = IssueFilter {
            jql: Some(params.jql.clone()),
            limit: params.limit,
            ..IssueFilter::default()
        };
        let issues = self.client.list_issues(&filter).await?;

        Ok(issue_report(
            format!("Found {} issue(s) matching JQL: {}", issues.len(), params.jql),
            issues,
        ))
    }
}

/// Tool to show one issue in full.
pub struct ViewIssueTool {
    client: Arc<JiraClient>,
}

#[derive(Debug, Deserialize)]
struct IssueKeyParams {
    issue_key: String,
}

#[async_trait]
impl Tool for ViewIssueTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "jira_view_issue",
            "Show a Jira issue with its status, people, labels and description",
        )
        .with_adapter(Adapter::Jira)
        .with_schema(ToolSchema::new().param(issue_key_param()))
    }

    fn validate(&self, args: &Value) -> McpServerResult<()> {
        check_issue_key(args)
    }

    #[instrument(skip(self, args, _context), fields(tool = "jira_view_issue"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: IssueKeyParams = parse_args(args)?;

        match self.client.view_issue(&params.issue_key).await {
            Ok(issue) => Ok(ToolResult::text(issue.to_string())),
            Err(McpServerError::UnrecognizedFormat(_)) => Ok(ToolResult::text(format!(
                "Found issue {} but its details were not in a recognized format",
                params.issue_key
            ))),
            Err(e) => Err(e),
        }
    }
}

/// Tool to set the story point estimate of an issue.
pub struct SetStoryPointsTool {
    client: Arc<JiraClient>,
}

#[derive(Debug, Deserialize)]
struct SetStoryPointsParams {
    issue_key: String,
    points: u32,
}

#[async_trait]
impl Tool for SetStoryPointsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "jira_set_story_points",
            "Set the story point estimate of a Jira issue (Fibonacci values only)",
        )
        .with_adapter(Adapter::Jira)
        .with_schema(
            ToolSchema::new().param(issue_key_param()).param(
                ParamSpec::number("points", "Story points: 1, 2, 3, 5, 8, 13, 21, 34, 55 or 89")
                    .required(),
            ),
        )
    }

    fn validate(&self, args: &Value) -> McpServerResult<()> {
        check_issue_key(args)?;
        let points = args["points"].as_u64();
        match points {
            Some(p) if STORY_POINTS.iter().any(|&allowed| u64::from(allowed) == p) => Ok(()),
            _ => Err(McpServerError::InvalidParams(format!(
                "points must be one of {:?}, got {}",
                STORY_POINTS, args["points"]
            ))),
        }
    }

    #[instrument(skip(self, args, _context), fields(tool = "jira_set_story_points"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: SetStoryPointsParams = parse_args(args)?;
        let output = self
            .client
            .set_story_points(&params.issue_key, params.points)
            .await?;

        let mut result = ToolResult::text(format!(
            "Set story points of {} to {}",
            params.issue_key, params.points
        ));
        if !output.trim().is_empty() {
            result = result.with_block(output.trim());
        }
        Ok(result)
    }
}

/// Tool to comment on an issue.
pub struct AddCommentTool {
    client: Arc<JiraClient>,
}

#[derive(Debug, Deserialize)]
struct AddCommentParams {
    issue_key: String,
    body: String,
}

#[async_trait]
impl Tool for AddCommentTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("jira_add_comment", "Add a comment to a Jira issue")
            .with_adapter(Adapter::Jira)
            .with_schema(
                ToolSchema::new()
                    .param(issue_key_param())
                    .param(ParamSpec::string("body", "Comment text").required()),
            )
    }

    fn validate(&self, args: &Value) -> McpServerResult<()> {
        check_issue_key(args)
    }

    #[instrument(skip(self, args, _context), fields(tool = "jira_add_comment"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: AddCommentParams = parse_args(args)?;
        self.client
            .add_comment(&params.issue_key, &params.body)
            .await?;
        Ok(ToolResult::text(format!("Added comment to {}", params.issue_key)))
    }
}

/// All Jira tools, in discovery order.
pub fn jira_tools(client: Arc<JiraClient>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ListIssuesTool { client: client.clone() }),
        Arc::new(SearchIssuesTool { client: client.clone() }),
        Arc::new(ViewIssueTool { client: client.clone() }),
        Arc::new(SetStoryPointsTool { client: client.clone() }),
        Arc::new(AddCommentTool { client }),
    ]
}
