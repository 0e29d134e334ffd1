//! Credential resolution.
//!
//! Credentials are fetched on demand from an external secret store for every
//! outbound call and dropped as soon as that call completes. Nothing here
//! caches a secret, and secret values never reach the logs: [`Secret`] redacts
//! itself in `Debug` and `Display`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::executor::cli::search_path;

/// Credential errors.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The secret store could not produce the requested fields.
    #[error("Credential '{item}' unavailable: {reason}")]
    Unavailable {
        /// Credential item name.
        item: String,
        /// Why retrieval failed.
        reason: String,
    },
}

impl CredentialError {
    fn unavailable(item: &str, reason: impl Into<String>) -> Self {
        CredentialError::Unavailable {
            item: item.to_string(),
            reason: reason.into(),
        }
    }
}

/// A secret string value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying value for use in an outbound call.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Names the credential item and fields an outbound request needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRef {
    /// Item name in the secret store.
    pub item: String,
    /// Field names to resolve, in order.
    pub fields: Vec<String>,
}

impl CredentialRef {
    /// Create a credential reference.
    pub fn new<I, S>(item: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            item: item.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// Resolved secret values for one outbound call, in request order.
#[derive(Debug, Clone)]
pub struct CredentialSet {
    item: String,
    values: Vec<(String, Secret)>,
}

impl CredentialSet {
    /// An empty set for `item`.
    pub fn new(item: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            values: Vec::new(),
        }
    }

    /// Add a resolved field.
    pub fn insert(&mut self, field: impl Into<String>, value: Secret) {
        self.values.push((field.into(), value));
    }

    /// Item this set was resolved from.
    pub fn item(&self) -> &str {
        &self.item
    }

    /// Look up a field.
    pub fn get(&self, field: &str) -> Result<&Secret, CredentialError> {
        self.values
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, secret)| secret)
            .ok_or_else(|| {
                CredentialError::unavailable(&self.item, format!("field '{}' not resolved", field))
            })
    }

    /// Iterate over `(field, secret)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Secret)> {
        self.values.iter().map(|(name, secret)| (name.as_str(), secret))
    }

    /// Number of resolved fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no field was resolved.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Source of credentials.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Resolve `fields` of credential item `item`.
    ///
    /// Fails when any field is missing or empty; there is no retry.
    async fn resolve(&self, item: &str, fields: &[String]) -> Result<CredentialSet, CredentialError>;
}

fn ensure_complete(set: &CredentialSet, fields: &[String]) -> Result<(), CredentialError> {
    if set.len() != fields.len() {
        return Err(CredentialError::unavailable(
            set.item(),
            format!(
                "expected {} field(s), secret store returned {}",
                fields.len(),
                set.len()
            ),
        ));
    }
    Ok(())
}

/// Resolves credentials by running an external secrets command once per field.
///
/// The argument template is passed as a structured argument list; `{item}` and
/// `{field}` inside any argument are substituted. The default template targets
/// the 1Password CLI: `op item get {item} --fields label={field} --reveal`.
#[derive(Debug, Clone)]
pub struct CommandCredentialProvider {
    program: String,
    args_template: Vec<String>,
    extra_path: Vec<PathBuf>,
}

impl CommandCredentialProvider {
    /// Create a provider for `program` with the given argument template.
    pub fn new<I, S>(program: impl Into<String>, args_template: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args_template: args_template.into_iter().map(Into::into).collect(),
            extra_path: Vec::new(),
        }
    }

    /// Directories appended to `PATH` when locating the program.
    pub fn with_extra_path(mut self, dirs: Vec<PathBuf>) -> Self {
        self.extra_path = dirs;
        self
    }

    fn args_for(&self, item: &str, field: &str) -> Vec<String> {
        self.args_template
            .iter()
            .map(|arg| arg.replace("{item}", item).replace("{field}", field))
            .collect()
    }

    async fn fetch_field(&self, item: &str, field: &str) -> Result<Secret, CredentialError> {
        let output = Command::new(&self.program)
            .args(self.args_for(item, field))
            .env("PATH", search_path(&self.extra_path))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                CredentialError::unavailable(item, format!("failed to run {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(
                "Secrets command exited with {} for item '{}' field '{}'",
                output.status, item, field
            );
            let reason = if stderr.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr
            };
            return Err(CredentialError::unavailable(item, reason));
        }

        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if value.is_empty() {
            return Err(CredentialError::unavailable(
                item,
                format!("empty value for field '{}'", field),
            ));
        }
        Ok(Secret::new(value))
    }
}

#[async_trait]
impl CredentialProvider for CommandCredentialProvider {
    #[instrument(skip(self, names), fields(program = %self.program))]
    async fn resolve(&self, item: &str, names: &[String]) -> Result<CredentialSet, CredentialError> {
        debug!("Resolving {} field(s) of credential item '{}'", names.len(), item);

        let mut set = CredentialSet::new(item);
        for field in names {
            let secret = self.fetch_field(item, field).await?;
            set.insert(field.clone(), secret);
        }

        ensure_complete(&set, names)?;
        Ok(set)
    }
}

/// Serves fixed credential values; used for tests and local development.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
    items: HashMap<String, Vec<(String, Secret)>>,
}

impl StaticCredentialProvider {
    /// An empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field value to an item.
    pub fn with_field(
        mut self,
        item: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.items
            .entry(item.into())
            .or_default()
            .push((field.into(), Secret::new(value)));
        self
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn resolve(&self, item: &str, fields: &[String]) -> Result<CredentialSet, CredentialError> {
        let stored = self
            .items
            .get(item)
            .ok_or_else(|| CredentialError::unavailable(item, "no such item"))?;

        let mut set = CredentialSet::new(item);
        for field in fields {
            if let Some((_, secret)) = stored.iter().find(|(name, _)| name == field) {
                if secret.expose().trim().is_empty() {
                    return Err(CredentialError::unavailable(
                        item,
                        format!("empty value for field '{}'", field),
                    ));
                }
                set.insert(field.clone(), Secret::new(secret.expose().trim()));
            }
        }

        ensure_complete(&set, fields)?;
        Ok(set)
    }
}
