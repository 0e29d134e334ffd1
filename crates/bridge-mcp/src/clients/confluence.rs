//! Confluence client (REST API v2, HTTP Basic auth).

use super::config::BridgeConfig;
use crate::credentials::{CredentialProvider, CredentialRef};
use crate::executor::{AuthScheme, BaseUrl, HttpExecutor, OutboundRequest, RawResponse, RequestExecutor};
use crate::normalize::{normalize, normalize_list, Page, RecordKind, Space};
use crate::server::{McpServerError, McpServerResult};
use std::sync::Arc;
use tracing::{debug, instrument};

pub const USERNAME_FIELD: &str = "username";
pub const TOKEN_FIELD: &str = "token";
pub const BASE_URL_FIELD: &str = "base url";

const SPACES: &str = "/wiki/api/v2/spaces";
const PAGES: &str = "/wiki/api/v2/pages";
const RESULTS: &[&str] = &["results"];

/// Confluence client.
#[derive(Clone)]
pub struct ConfluenceClient {
    executor: Arc<dyn RequestExecutor>,
    credential: CredentialRef,
}

impl ConfluenceClient {
    /// Create a client over any executor.
    pub fn new(executor: Arc<dyn RequestExecutor>, credential: CredentialRef) -> Self {
        Self {
            executor,
            credential,
        }
    }

    /// Create an HTTP client from configuration.
    ///
    /// Without a configured base URL the site URL is read from the
    /// credential item's `base url` field on every call.
    pub fn from_config(config: &BridgeConfig, provider: Arc<dyn CredentialProvider>) -> McpServerResult<Self> {
        let mut fields = vec![USERNAME_FIELD, TOKEN_FIELD];
        let base = match &config.confluence.base_url {
            Some(url) => BaseUrl::Fixed(url.clone()),
            None => {
                fields.push(BASE_URL_FIELD);
                BaseUrl::FromCredential(BASE_URL_FIELD.to_string())
            }
        };

        let executor = HttpExecutor::new(
            base,
            AuthScheme::basic(USERNAME_FIELD, TOKEN_FIELD),
            provider,
            config.timeout(),
        )?;
        let credential = CredentialRef::new(&config.confluence.credential_item, fields);
        Ok(Self::new(Arc::new(executor), credential))
    }

    fn request(&self, path: &str) -> OutboundRequest {
        OutboundRequest::new(path, self.credential.clone())
    }

    /// List spaces.
    #[instrument(skip(self))]
    pub async fn list_spaces(&self, limit: u32) -> McpServerResult<Vec<Space>> {
        let raw = self.executor.execute(self.request(SPACES).param("limit", limit)).await?;
        Ok(normalize_list(raw, RecordKind::Space, RESULTS)
            .into_iter()
            .filter_map(|record| Space::try_from(record).ok())
            .collect())
    }

    /// Fetch a page with its storage-format body.
    #[instrument(skip(self))]
    pub async fn get_page(&self, page_id: &str) -> McpServerResult<Page> {
        let request = self
            .request(PAGES)
            .segment(page_id)
            .param("body-format", "storage");
        let raw = self.executor.execute(request).await?;

        normalize(raw, RecordKind::Page)
            .and_then(|record| Page::try_from(record).ok())
            .ok_or_else(|| McpServerError::UnrecognizedFormat(format!("page {}", page_id)))
    }

    /// List pages in a space.
    #[instrument(skip(self))]
    pub async fn list_space_pages(&self, space_id: &str, limit: u32) -> McpServerResult<Vec<Page>> {
        let request = self
            .request(SPACES)
            .segment(space_id)
            .segment("pages")
            .param("limit", limit);
        let raw = self.executor.execute(request).await?;
        Ok(pages(raw))
    }

    /// Most recently modified pages whose title contains `query`
    /// (case-insensitive), optionally within one space.
    #[instrument(skip(self))]
    pub async fn search_pages(&self, query: &str, space_id: Option<&str>, limit: u32) -> McpServerResult<Vec<Page>> {
        let request = self
            .request(PAGES)
            .param_opt("space-id", space_id)
            .param("limit", limit)
            .param("sort", "-modified-date");
        let raw = self.executor.execute(request).await?;

        let needle = query.to_lowercase();
        let candidates = pages(raw);
        let scanned = candidates.len();
        let matches: Vec<Page> = candidates
            .into_iter()
            .filter(|page| page.title.to_lowercase().contains(&needle))
            .collect();
        debug!("{} of {} page(s) match '{}'", matches.len(), scanned, query);
        Ok(matches)
    }
}

fn pages(raw: RawResponse) -> Vec<Page> {
    normalize_list(raw, RecordKind::Page, RESULTS)
        .into_iter()
        .filter_map(|record| Page::try_from(record).ok())
        .collect()
}
