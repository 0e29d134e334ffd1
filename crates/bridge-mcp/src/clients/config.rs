//! Bridge configuration.
//!
//! Provides the settings every adapter needs: how to reach the secrets
//! tool, extra binary search directories, the HTTP timeout and each
//! upstream's endpoint and credential item. Configuration is loaded from
//! environment variables with defaults suitable for a developer machine.

use crate::credentials::CommandCredentialProvider;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// How credentials are fetched from the secret store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretsConfig {
    /// Secret-retrieval program.
    pub command: String,

    /// Argument template; `{item}` and `{field}` are substituted.
    pub args: Vec<String>,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            command: "op".to_string(),
            args: split_words("item get {item} --fields label={field} --reveal"),
        }
    }
}

/// Jira CLI settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JiraConfig {
    /// Program to run.
    pub cli_path: String,

    /// Secret item holding the API token.
    pub credential_item: String,
}

/// A REST upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    /// Base URL; `None` means it is read from the credential item.
    pub base_url: Option<String>,

    /// Secret item holding the credentials.
    pub credential_item: String,
}

impl ServiceEndpoint {
    fn new(base_url: Option<&str>, credential_item: &str) -> Self {
        Self {
            base_url: base_url.map(str::to_string),
            credential_item: credential_item.to_string(),
        }
    }
}

/// Configuration shared by all adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Secrets tool invocation.
    pub secrets: SecretsConfig,

    /// Directories appended to `PATH` for every subprocess.
    pub extra_path: Vec<PathBuf>,

    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,

    /// Jira CLI.
    pub jira: JiraConfig,

    /// Confluence REST API.
    pub confluence: ServiceEndpoint,

    /// Slack Web API.
    pub slack: ServiceEndpoint,

    /// Zoom REST API.
    pub zoom: ServiceEndpoint,
}

impl Default for BridgeConfig {
    /// Returns default configuration suitable for local development.
    fn default() -> Self {
        Self {
            secrets: SecretsConfig::default(),
            extra_path: split_path("/opt/homebrew/bin:/usr/local/bin"),
            timeout_secs: 30,
            jira: JiraConfig {
                cli_path: "jira".to_string(),
                credential_item: "Jira".to_string(),
            },
            confluence: ServiceEndpoint::new(None, "Confluence"),
            slack: ServiceEndpoint::new(Some("https://slack.com/api"), "Slack"),
            zoom: ServiceEndpoint::new(Some("https://api.zoom.us/v2"), "Zoom"),
        }
    }
}

fn split_words(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

fn split_path(s: &str) -> Vec<PathBuf> {
    s.split(':')
        .filter(|dir| !dir.trim().is_empty())
        .map(PathBuf::from)
        .collect()
}

impl BridgeConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `BRIDGE_SECRETS_COMMAND`: secrets program (default: op)
    /// - `BRIDGE_SECRETS_ARGS`: argument template (default: item get {item} --fields label={field} --reveal)
    /// - `BRIDGE_EXTRA_PATH`: `:`-separated directories appended to PATH
    /// - `BRIDGE_TIMEOUT_SECS`: HTTP timeout in seconds (default: 30)
    /// - `JIRA_CLI_PATH`, `JIRA_CREDENTIAL_ITEM`
    /// - `CONFLUENCE_BASE_URL` (default: the item's `base url` field), `CONFLUENCE_CREDENTIAL_ITEM`
    /// - `SLACK_API_URL`, `SLACK_CREDENTIAL_ITEM`
    /// - `ZOOM_API_URL`, `ZOOM_CREDENTIAL_ITEM`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secrets = SecretsConfig {
            command: var("BRIDGE_SECRETS_COMMAND").unwrap_or(default.secrets.command),
            args: var("BRIDGE_SECRETS_ARGS")
                .map(|s| split_words(&s))
                .unwrap_or(default.secrets.args),
        };

        let timeout_secs = match var("BRIDGE_TIMEOUT_SECS") {
            Some(raw) => parse_timeout("BRIDGE_TIMEOUT_SECS", &raw)?,
            None => default.timeout_secs,
        };

        Ok(Self {
            secrets,
            extra_path: var("BRIDGE_EXTRA_PATH")
                .map(|s| split_path(&s))
                .unwrap_or(default.extra_path),
            timeout_secs,
            jira: JiraConfig {
                cli_path: var("JIRA_CLI_PATH").unwrap_or(default.jira.cli_path),
                credential_item: var("JIRA_CREDENTIAL_ITEM").unwrap_or(default.jira.credential_item),
            },
            confluence: ServiceEndpoint {
                base_url: var("CONFLUENCE_BASE_URL").or(default.confluence.base_url),
                credential_item: var("CONFLUENCE_CREDENTIAL_ITEM")
                    .unwrap_or(default.confluence.credential_item),
            },
            slack: ServiceEndpoint {
                base_url: var("SLACK_API_URL").or(default.slack.base_url),
                credential_item: var("SLACK_CREDENTIAL_ITEM").unwrap_or(default.slack.credential_item),
            },
            zoom: ServiceEndpoint {
                base_url: var("ZOOM_API_URL").or(default.zoom.base_url),
                credential_item: var("ZOOM_CREDENTIAL_ITEM").unwrap_or(default.zoom.credential_item),
            },
        })
    }

    /// Override the secrets program.
    pub fn with_secrets_command(mut self, command: impl Into<String>) -> Self {
        self.secrets.command = command.into();
        self
    }

    /// Override the HTTP timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Result<Self, ConfigError> {
        if secs == 0 {
            return Err(ConfigError::invalid("timeout", "must be greater than zero"));
        }
        self.timeout_secs = secs;
        Ok(self)
    }

    /// Get the request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Credential provider backed by the configured secrets program.
    pub fn credential_provider(&self) -> CommandCredentialProvider {
        CommandCredentialProvider::new(&self.secrets.command, self.secrets.args.clone())
            .with_extra_path(self.extra_path.clone())
    }
}

fn parse_timeout(key: &str, raw: &str) -> Result<u64, ConfigError> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|e| ConfigError::invalid(key, format!("'{}' is not a number: {}", raw, e)))?;
    if secs == 0 {
        return Err(ConfigError::invalid(key, "must be greater than zero"));
    }
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.secrets.command, "op");
        assert_eq!(
            config.secrets.args,
            vec!["item", "get", "{item}", "--fields", "label={field}", "--reveal"]
        );
        assert_eq!(
            config.extra_path,
            vec![PathBuf::from("/opt/homebrew/bin"), PathBuf::from("/usr/local/bin")]
        );
        assert!(config.confluence.base_url.is_none());
        assert_eq!(config.zoom.base_url.as_deref(), Some("https://api.zoom.us/v2"));
    }

    #[test]
    fn test_env_overrides() {
        let config = BridgeConfig::from_lookup(lookup(&[
            ("BRIDGE_SECRETS_COMMAND", "bw"),
            ("BRIDGE_SECRETS_ARGS", "get item {item}"),
            ("BRIDGE_TIMEOUT_SECS", "5"),
            ("CONFLUENCE_BASE_URL", "https://acme.atlassian.net"),
            ("SLACK_CREDENTIAL_ITEM", "Slack Bot"),
            ("BRIDGE_EXTRA_PATH", "/a::/b"),
        ]))
        .unwrap();
        assert_eq!(config.secrets.command, "bw");
        assert_eq!(config.secrets.args, vec!["get", "item", "{item}"]);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.confluence.base_url.as_deref(), Some("https://acme.atlassian.net"));
        assert_eq!(config.slack.credential_item, "Slack Bot");
        assert_eq!(config.extra_path, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
    }

    #[test]
    fn test_invalid_timeout() {
        let err = BridgeConfig::from_lookup(lookup(&[("BRIDGE_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("BRIDGE_TIMEOUT_SECS"));

        assert!(BridgeConfig::from_lookup(lookup(&[("BRIDGE_TIMEOUT_SECS", "0")])).is_err());
        assert!(BridgeConfig::default().with_timeout_secs(0).is_err());
    }
}
