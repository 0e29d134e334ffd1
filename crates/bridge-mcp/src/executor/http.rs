//! HTTP request executor for the REST adapters.

use super::{ExecutorError, OutboundRequest, RawResponse, RequestExecutor};
use crate::credentials::{CredentialProvider, CredentialSet};
use crate::normalize::fields;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// Where an upstream reports the reason for a failure, in priority order.
const REASON_KEYS: fields::Candidates = &[
    "error",
    "message",
    "errors.0.title",
    "errors.0.message",
    "error_description",
];

/// How resolved credentials are attached to the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>`.
    Bearer { token_field: String },
    /// HTTP Basic with username and password (API token).
    Basic {
        username_field: String,
        password_field: String,
    },
}

impl AuthScheme {
    /// Bearer auth reading the token from `token_field`.
    pub fn bearer(token_field: impl Into<String>) -> Self {
        AuthScheme::Bearer {
            token_field: token_field.into(),
        }
    }

    /// Basic auth reading the two halves from the given fields.
    pub fn basic(username_field: impl Into<String>, password_field: impl Into<String>) -> Self {
        AuthScheme::Basic {
            username_field: username_field.into(),
            password_field: password_field.into(),
        }
    }

    fn apply(&self, builder: RequestBuilder, credentials: &CredentialSet) -> Result<RequestBuilder, ExecutorError> {
        Ok(match self {
            AuthScheme::Bearer { token_field } => {
                builder.bearer_auth(credentials.get(token_field)?.expose())
            }
            AuthScheme::Basic {
                username_field,
                password_field,
            } => builder.basic_auth(
                credentials.get(username_field)?.expose(),
                Some(credentials.get(password_field)?.expose()),
            ),
        })
    }
}

/// Base URL of the upstream API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseUrl {
    /// Known up front (configuration).
    Fixed(String),
    /// Read from the named credential field on every call.
    FromCredential(String),
}

impl BaseUrl {
    fn resolve(&self, credentials: &CredentialSet) -> Result<String, ExecutorError> {
        match self {
            BaseUrl::Fixed(url) => Ok(url.clone()),
            BaseUrl::FromCredential(field) => Ok(credentials.get(field)?.expose().to_string()),
        }
    }
}

/// Build the full URL for a request.
///
/// `target` is joined onto `base`; segments are appended percent-encoded
/// and parameters become query pairs in insertion order.
pub fn build_url(base: &str, request: &OutboundRequest) -> Result<Url, ExecutorError> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        request.target().trim_start_matches('/')
    );
    let mut url = Url::parse(&joined).map_err(|e| ExecutorError::InvalidRequest {
        target: request.target().to_string(),
        reason: format!("bad URL '{}': {}", joined, e),
    })?;

    if !request.segments().is_empty() {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| ExecutorError::InvalidRequest {
                target: request.target().to_string(),
                reason: format!("'{}' cannot take path segments", joined),
            })?;
        path.pop_if_empty();
        for segment in request.segments() {
            path.push(segment);
        }
    }

    if !request.params().is_empty() {
        let mut query = url.query_pairs_mut();
        for (name, value) in request.params() {
            query.append_pair(name, &value.to_string());
        }
    }

    Ok(url)
}

/// Upstream-reported reason in an error payload.
pub fn upstream_reason(body: &Value) -> Option<String> {
    fields::opt_string(body, REASON_KEYS).filter(|reason| !reason.trim().is_empty())
}

/// Detect application-level failures carried in a 2xx JSON body.
///
/// Slack answers `{"ok": false, "error": "..."}`; Zoom answers a bare
/// `{"code": 3001, "message": "..."}` with no data.
pub fn application_error(body: &Value) -> Option<String> {
    let object = body.as_object()?;

    if object.get("ok").and_then(Value::as_bool) == Some(false) {
        return Some(upstream_reason(body).unwrap_or_else(|| "ok=false".to_string()));
    }

    let code = object.get("code").and_then(Value::as_i64);
    let message = object.get("message").and_then(Value::as_str);
    match (code, message) {
        (Some(code), Some(message)) if object.len() <= 3 => {
            Some(format!("{} (code {})", message, code))
        }
        _ => None,
    }
}

/// Executes requests as a single authenticated GET.
#[derive(Clone)]
pub struct HttpExecutor {
    client: Client,
    base: BaseUrl,
    auth: AuthScheme,
    provider: Arc<dyn CredentialProvider>,
}

impl HttpExecutor {
    /// Create an executor.
    pub fn new(
        base: BaseUrl,
        auth: AuthScheme,
        provider: Arc<dyn CredentialProvider>,
        timeout: Duration,
    ) -> Result<Self, ExecutorError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExecutorError::InvalidRequest {
                target: "http client".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base,
            auth,
            provider,
        })
    }

    async fn send(&self, request: &OutboundRequest, credentials: &CredentialSet) -> Result<reqwest::Response, ExecutorError> {
        let base = self.base.resolve(credentials)?;
        let url = build_url(&base, request)?;
        debug!("GET {}{}", url.path(), url.query().map(|q| format!("?{}", q)).unwrap_or_default());

        let builder = self.client.get(url).header(ACCEPT, "application/json");
        let builder = self.auth.apply(builder, credentials)?;

        builder
            .send()
            .await
            .map_err(|e| ExecutorError::transport(request.target(), e.to_string()))
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    #[instrument(skip(self, request), fields(endpoint = %request.target()))]
    async fn execute(&self, request: OutboundRequest) -> Result<RawResponse, ExecutorError> {
        let credential = request.credential();
        let credentials = self
            .provider
            .resolve(&credential.item, &credential.fields)
            .await?;

        let response = self.send(&request, &credentials).await;
        drop(credentials);
        let response = response?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExecutorError::transport(request.target(), e.to_string()))?;
        let parsed: Option<Value> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let reason = parsed
                .as_ref()
                .and_then(upstream_reason)
                .or_else(|| {
                    let text = body.trim();
                    (!text.is_empty() && text.len() <= 200).then(|| text.to_string())
                })
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
            warn!("{} returned HTTP {}: {}", request.target(), status.as_u16(), reason);
            return Err(ExecutorError::transport(
                request.target(),
                format!("HTTP {}: {}", status.as_u16(), reason),
            ));
        }

        match parsed {
            Some(value) => {
                if let Some(reason) = application_error(&value) {
                    warn!("{} reported an error: {}", request.target(), reason);
                    return Err(ExecutorError::transport(request.target(), reason));
                }
                Ok(RawResponse::Json(value))
            }
            None => Ok(RawResponse::Text(body)),
        }
    }
}
