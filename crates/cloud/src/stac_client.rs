//! Async STAC Item Search client.
//!
//! Earth Search is the default catalog; any STAC API root or `/search`
//! URL can be used via [`StacCatalog::Custom`]. Each request is sent
//! once: no retries and, unless configured, no timeout.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::error::{CloudError, Result};
use crate::stac_models::{StacItemCollection, StacLink, StacSearchParams};

// ---------------------------------------------------------------------------
// Catalog enum
// ---------------------------------------------------------------------------

/// Well-known STAC catalogs plus custom endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StacCatalog {
    /// AWS Earth Search (Element 84), which indexes Sentinel-2 L2A COGs.
    #[default]
    EarthSearch,
    /// Any STAC API endpoint, given as its root URL.
    Custom(String),
}

impl StacCatalog {
    /// Full POST `/search` URL for this catalog.
    pub fn search_url(&self) -> String {
        match self {
            Self::EarthSearch => "https://earth-search.aws.element84.com/v1/search".to_string(),
            Self::Custom(base) => {
                let base = base.trim_end_matches('/');
                if base.ends_with("/search") {
                    base.to_string()
                } else {
                    format!("{}/search", base)
                }
            }
        }
    }

    /// `"es"` / `"earth-search"` select Earth Search; anything else is a URL.
    pub fn from_str_or_url(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "es" | "earth-search" | "earthsearch" => Self::EarthSearch,
            _ => Self::Custom(s.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for [`StacClient`].
#[derive(Debug, Clone, Default)]
pub struct StacClientOptions {
    /// Per-request timeout. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Async client for STAC Item Search.
#[derive(Debug, Clone)]
pub struct StacClient {
    catalog: StacCatalog,
    client: reqwest::Client,
}

impl StacClient {
    pub fn new(catalog: StacCatalog, options: StacClientOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| CloudError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { catalog, client })
    }

    pub fn catalog(&self) -> &StacCatalog {
        &self.catalog
    }

    /// Run a search and return its first page.
    pub async fn search(&self, params: &StacSearchParams) -> Result<StacItemCollection> {
        let body = serde_json::to_value(params)
            .map_err(|e| CloudError::Network(format!("serializing params: {e}")))?;
        self.post_search(&self.catalog.search_url(), &body).await
    }

    /// Fetch the page after `page`, or `None` on the last page.
    pub async fn next_page(
        &self,
        page: &StacItemCollection,
        params: &StacSearchParams,
    ) -> Result<Option<StacItemCollection>> {
        match page.next_link() {
            Some(link) => self.follow_next(link, params).await.map(Some),
            None => Ok(None),
        }
    }

    async fn post_search(&self, url: &str, body: &Value) -> Result<StacItemCollection> {
        debug!(url, %body, "STAC search");
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| CloudError::Network(format!("STAC search request failed: {e}")))?;

        parse_page(resp).await
    }

    /// Follow a pagination link. Handles both POST (body/merge) and GET links.
    async fn follow_next(
        &self,
        link: &StacLink,
        params: &StacSearchParams,
    ) -> Result<StacItemCollection> {
        let method = link.method.as_deref().unwrap_or("GET").to_uppercase();
        if method != "POST" {
            debug!(url = %link.href, "STAC pagination");
            let resp = self
                .client
                .get(&link.href)
                .send()
                .await
                .map_err(|e| CloudError::Network(format!("GET pagination: {e}")))?;
            return parse_page(resp).await;
        }

        let body = next_body(link, params)?;
        self.post_search(&link.href, &body).await
    }
}

/// Request body for a POST `next` link.
///
/// With `merge: true` the link body is overlaid on the original parameters;
/// otherwise it replaces them.
fn next_body(link: &StacLink, params: &StacSearchParams) -> Result<Value> {
    let original = || {
        serde_json::to_value(params)
            .map_err(|e| CloudError::Network(format!("serializing params: {e}")))
    };

    match (&link.body, link.merge.unwrap_or(false)) {
        (Some(link_body), true) => {
            let mut base = original()?;
            if let (Some(base_obj), Some(link_obj)) = (base.as_object_mut(), link_body.as_object())
            {
                for (k, v) in link_obj {
                    base_obj.insert(k.clone(), v.clone());
                }
            }
            Ok(base)
        }
        (Some(link_body), false) => Ok(link_body.clone()),
        (None, _) => original(),
    }
}

async fn parse_page(resp: reqwest::Response) -> Result<StacItemCollection> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| CloudError::Network(format!("reading response body: {e}")))?;

    if !status.is_success() {
        return Err(CloudError::Network(format!(
            "STAC search returned HTTP {}: {}",
            status,
            body.chars().take(500).collect::<String>()
        )));
    }

    serde_json::from_str(&body)
        .map_err(|e| CloudError::Network(format!("parsing STAC response: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
