//! Upstream clients, one per adapter.
//!
//! Each client turns typed calls into [`OutboundRequest`]s for a
//! [`RequestExecutor`] and normalizes what comes back:
//! - Jira: the `jira` command line client
//! - Confluence: REST API v2 with HTTP Basic auth
//! - Slack: Web API with a bearer token
//! - Zoom: REST API v2 with a bearer token
//!
//! Clients hold no credentials; the executor resolves them per call.
//!
//! [`OutboundRequest`]: crate::executor::OutboundRequest
//! [`RequestExecutor`]: crate::executor::RequestExecutor

pub mod config;
pub mod confluence;
pub mod jira;
pub mod slack;
pub mod zoom;

pub use config::{BridgeConfig, ConfigError, JiraConfig, SecretsConfig, ServiceEndpoint};
pub use confluence::ConfluenceClient;
pub use jira::{IssueFilter, JiraClient};
pub use slack::SlackClient;
pub use zoom::{MeetingMatch, MeetingSearch, ZoomClient};
