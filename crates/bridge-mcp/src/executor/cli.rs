//! Command line request executor.
//!
//! Runs an external program with a structured argument list. Nothing is
//! passed through a shell, so user-supplied values reach the program as
//! literal arguments.

use super::{ExecutorError, OutboundRequest, ParamValue, RawResponse, RequestExecutor};
use crate::credentials::CredentialProvider;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// The inherited `PATH` followed by `extra` directories not already on it.
pub(crate) fn search_path(extra: &[PathBuf]) -> OsString {
    let inherited = std::env::var_os("PATH").unwrap_or_default();
    let mut dirs: Vec<PathBuf> = std::env::split_paths(&inherited).collect();
    for dir in extra {
        if !dirs.contains(dir) {
            dirs.push(dir.clone());
        }
    }
    std::env::join_paths(dirs).unwrap_or(inherited)
}

/// Exports a credential field to the child as an environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialEnv {
    pub field: String,
    pub var: String,
}

impl CredentialEnv {
    pub fn new(field: impl Into<String>, var: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            var: var.into(),
        }
    }
}

/// Executes requests by running a CLI program once per request.
#[derive(Clone)]
pub struct CliExecutor {
    program: String,
    extra_path: Vec<PathBuf>,
    credential_env: Vec<CredentialEnv>,
    provider: Arc<dyn CredentialProvider>,
}

impl CliExecutor {
    /// Create an executor for `program`.
    pub fn new(program: impl Into<String>, provider: Arc<dyn CredentialProvider>) -> Self {
        Self {
            program: program.into(),
            extra_path: Vec::new(),
            credential_env: Vec::new(),
            provider,
        }
    }

    /// Directories appended to `PATH` for the child.
    pub fn with_extra_path(mut self, dirs: Vec<PathBuf>) -> Self {
        self.extra_path = dirs;
        self
    }

    /// Export a credential field as an environment variable.
    pub fn with_credential_env(mut self, mapping: CredentialEnv) -> Self {
        self.credential_env.push(mapping);
        self
    }

    /// Argument list for a request.
    ///
    /// The target is split on whitespace into subcommand words, then every
    /// parameter follows as `--name value`. `Flag(true)` becomes a bare
    /// `--name`; `Flag(false)` is left out. Segments come last, after a
    /// `--` terminator, so a value starting with `-` is never read as a flag.
    pub fn command_line(request: &OutboundRequest) -> Vec<String> {
        let mut args: Vec<String> = request
            .target()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        for (name, value) in request.params() {
            match value {
                ParamValue::Flag(true) => args.push(format!("--{}", name)),
                ParamValue::Flag(false) => {}
                other => {
                    args.push(format!("--{}", name));
                    args.push(other.to_string());
                }
            }
        }

        if !request.segments().is_empty() {
            args.push("--".to_string());
            args.extend(request.segments().iter().cloned());
        }
        args
    }
}

#[async_trait]
impl RequestExecutor for CliExecutor {
    #[instrument(skip(self, request), fields(program = %self.program, subcommand = %request.target()))]
    async fn execute(&self, request: OutboundRequest) -> Result<RawResponse, ExecutorError> {
        let credential = request.credential();
        let credentials = self
            .provider
            .resolve(&credential.item, &credential.fields)
            .await?;

        let args = Self::command_line(&request);
        debug!("Running {} with {} argument(s)", self.program, args.len());

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .env("PATH", search_path(&self.extra_path))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        for mapping in &self.credential_env {
            command.env(&mapping.var, credentials.get(&mapping.field)?.expose());
        }

        let output = command.output().await;
        drop(command);
        drop(credentials);

        let output = output.map_err(|e| {
            ExecutorError::transport(
                request.target(),
                format!("failed to run {}: {}", self.program, e),
            )
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let reason = [stderr, stdout]
                .into_iter()
                .find(|s| !s.is_empty())
                .unwrap_or_else(|| format!("{} exited with {}", self.program, output.status));
            warn!("{} {} exited with {}", self.program, request.target(), output.status);
            return Err(ExecutorError::transport(request.target(), reason));
        }

        Ok(RawResponse::Text(
            String::from_utf8_lossy(&output.stdout).into_owned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{CredentialRef, StaticCredentialProvider};

    fn provider() -> Arc<dyn CredentialProvider> {
        Arc::new(StaticCredentialProvider::new().with_field("Jira", "token", "jira-secret"))
    }

    fn request(target: &str) -> OutboundRequest {
        OutboundRequest::new(target, CredentialRef::new("Jira", ["token"]))
    }

    #[test]
    fn test_command_line_layout() {
        let req = request("issue list")
            .param("project", "OPS")
            .param_opt::<String>("status", None)
            .param("paginate", "0:25")
            .param("plain", true)
            .param("no-headers", true)
            .param("watching", false);
        assert_eq!(
            CliExecutor::command_line(&req),
            vec!["issue", "list", "--project", "OPS", "--paginate", "0:25", "--plain", "--no-headers"]
        );
    }

    #[test]
    fn test_command_line_keeps_metacharacters_literal() {
        let req = request("issue comment add")
            .segment("OPS-1")
            .segment("done; rm -rf / $(whoami)");
        let args = CliExecutor::command_line(&req);
        assert_eq!(args.last().map(String::as_str), Some("done; rm -rf / $(whoami)"));
        assert_eq!(args.len(), 6);
    }

    #[test]
    fn test_command_line_segments_follow_terminator() {
        let req = request("issue comment add")
            .segment("OPS-1")
            .segment("--help")
            .param("no-input", true);
        assert_eq!(
            CliExecutor::command_line(&req),
            vec!["issue", "comment", "add", "--no-input", "--", "OPS-1", "--help"]
        );
    }

    #[tokio::test]
    async fn test_dash_leading_segment_reaches_program_as_operand() {
        let executor = CliExecutor::new("sh", provider());
        let raw = executor
            .execute(request("-c").segment("printf '%s' \"$0\"").segment("--help"))
            .await
            .unwrap();
        assert_eq!(raw.into_text(), "--help");
    }

    #[test]
    fn test_search_path_appends_once() {
        let extra = vec![PathBuf::from("/opt/bridge/bin"), PathBuf::from("/opt/bridge/bin")];
        let path = search_path(&extra);
        let dirs: Vec<PathBuf> = std::env::split_paths(&path).collect();
        assert_eq!(dirs.iter().filter(|d| d.as_path() == std::path::Path::new("/opt/bridge/bin")).count(), 1);
        assert_eq!(dirs.last(), Some(&PathBuf::from("/opt/bridge/bin")));
    }

    #[tokio::test]
    async fn test_exports_credential_env() {
        let executor = CliExecutor::new("sh", provider())
            .with_credential_env(CredentialEnv::new("token", "JIRA_API_TOKEN"));
        let raw = executor
            .execute(request("-c").segment("printf '%s' \"$JIRA_API_TOKEN\""))
            .await
            .unwrap();
        assert_eq!(raw.into_text(), "jira-secret");
    }

    #[tokio::test]
    async fn test_non_zero_exit_reports_stderr() {
        let executor = CliExecutor::new("sh", provider());
        let err = executor
            .execute(request("-c").segment("echo 'issue OPS-9 not found' >&2; exit 2"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "-c failed: issue OPS-9 not found");
    }

    #[tokio::test]
    async fn test_non_zero_exit_without_output() {
        let executor = CliExecutor::new("false", provider());
        let err = executor.execute(request("issue list")).await.unwrap_err();
        assert!(err.to_string().contains("false exited with"));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let executor = CliExecutor::new("definitely-not-jira", provider());
        let err = executor.execute(request("issue list")).await.unwrap_err();
        assert!(err.to_string().contains("failed to run definitely-not-jira"));
    }

    #[tokio::test]
    async fn test_credential_failure_skips_run() {
        let executor = CliExecutor::new("sh", Arc::new(StaticCredentialProvider::new()));
        let err = executor
            .execute(request("-c").segment("exit 0"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::Credential(_)));
    }
}
