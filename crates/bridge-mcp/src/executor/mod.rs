//! Outbound request execution.
//!
//! A [`RequestExecutor`] performs exactly one outbound call per
//! [`OutboundRequest`]: it resolves the request's credentials, calls the
//! external system once and hands back the unparsed [`RawResponse`]. There is
//! no retry and no connection reuse requirement; every call stands alone.
//!
//! - [`HttpExecutor`]: REST adapters (Confluence, Slack, Zoom)
//! - [`CliExecutor`]: command line adapters (Jira)

pub mod cli;
pub mod http;

pub use cli::{CliExecutor, CredentialEnv};
pub use http::{AuthScheme, BaseUrl, HttpExecutor};

use crate::credentials::{CredentialError, CredentialRef};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Executor errors.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Credentials could not be resolved; no outbound call was made.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The outbound call failed or the upstream reported a failure.
    #[error("{target} failed: {reason}")]
    Transport {
        /// Endpoint path or subcommand.
        target: String,
        /// Upstream-reported reason, when available.
        reason: String,
    },

    /// The request could not be turned into a call (e.g. malformed base URL).
    #[error("Invalid request for {target}: {reason}")]
    InvalidRequest {
        /// Endpoint path or subcommand.
        target: String,
        /// What was wrong.
        reason: String,
    },
}

impl ExecutorError {
    pub(crate) fn transport(target: &str, reason: impl Into<String>) -> Self {
        ExecutorError::Transport {
            target: target.to_string(),
            reason: reason.into(),
        }
    }
}

/// A scalar request parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    Integer(i64),
    Flag(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Text(s) => f.write_str(s),
            ParamValue::Integer(n) => write!(f, "{}", n),
            ParamValue::Flag(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<&String> for ParamValue {
    fn from(s: &String) -> Self {
        ParamValue::Text(s.clone())
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Integer(n)
    }
}

impl From<u32> for ParamValue {
    fn from(n: u32) -> Self {
        ParamValue::Integer(i64::from(n))
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Flag(b)
    }
}

/// One outbound call, immutable once built.
///
/// `target` is an endpoint path (HTTP) or a subcommand (CLI). `segments` are
/// appended as encoded path segments (HTTP) or positional arguments (CLI).
/// `params` keep insertion order; unset values are never recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    target: String,
    segments: Vec<String>,
    params: Vec<(String, ParamValue)>,
    credential: CredentialRef,
}

impl OutboundRequest {
    /// Start a request against `target` authenticated with `credential`.
    pub fn new(target: impl Into<String>, credential: CredentialRef) -> Self {
        Self {
            target: target.into(),
            segments: Vec::new(),
            params: Vec::new(),
            credential,
        }
    }

    /// Append a path segment or positional argument.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Append a parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Append a parameter only when it is set.
    pub fn param_opt<V: Into<ParamValue>>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn params(&self) -> &[(String, ParamValue)] {
        &self.params
    }

    pub fn credential(&self) -> &CredentialRef {
        &self.credential
    }

    /// Look up a parameter by name.
    pub fn get_param(&self, name: &str) -> Option<&ParamValue> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

/// Unparsed upstream response, consumed by exactly one normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    /// A JSON document in the upstream's own schema.
    Json(Value),
    /// Opaque text, typically CLI stdout.
    Text(String),
}

impl RawResponse {
    /// Parse as JSON; `None` when the payload is not JSON.
    pub fn into_json(self) -> Option<Value> {
        match self {
            RawResponse::Json(value) => Some(value),
            RawResponse::Text(text) => serde_json::from_str(text.trim()).ok(),
        }
    }

    /// The payload as text.
    pub fn into_text(self) -> String {
        match self {
            RawResponse::Json(value) => value.to_string(),
            RawResponse::Text(text) => text,
        }
    }
}

/// Performs one outbound call per request.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, request: OutboundRequest) -> Result<RawResponse, ExecutorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> CredentialRef {
        CredentialRef::new("Slack", ["token"])
    }

    #[test]
    fn test_params_keep_insertion_order_and_skip_unset() {
        let request = OutboundRequest::new("conversations.list", credential())
            .param("types", "public_channel")
            .param_opt::<String>("cursor", None)
            .param("limit", 100u32)
            .param("exclude_archived", true);

        let names: Vec<_> = request.params().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["types", "limit", "exclude_archived"]);
        assert_eq!(request.get_param("limit"), Some(&ParamValue::Integer(100)));
        assert!(request.get_param("cursor").is_none());
    }

    #[test]
    fn test_raw_response_into_json() {
        let raw = RawResponse::Text("  {\"key\": \"ABC-1\"}\n".to_string());
        assert_eq!(raw.into_json().unwrap()["key"], "ABC-1");

        let raw = RawResponse::Text("ABC-1\tSummary".to_string());
        assert!(raw.into_json().is_none());
    }
}
