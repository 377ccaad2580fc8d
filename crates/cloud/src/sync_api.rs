//! Blocking (synchronous) STAC API.
//!
//! Wraps the async [`StacClient`] with a Tokio runtime so the worker thread
//! can page through search results without managing its own runtime.

use std::sync::Arc;
use std::vec::IntoIter;

use crate::error::{CloudError, Result};
use crate::stac_client::{StacCatalog, StacClient, StacClientOptions};
use crate::stac_models::{StacItem, StacItemCollection, StacSearchParams};

/// Blocking wrapper around [`StacClient`].
///
/// Uses an internal single-threaded Tokio runtime shared by clones.
#[derive(Clone)]
pub struct StacClientBlocking {
    rt: Arc<tokio::runtime::Runtime>,
    inner: StacClient,
}

impl StacClientBlocking {
    pub fn new(catalog: StacCatalog, options: StacClientOptions) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CloudError::Network(e.to_string()))?;

        Ok(Self {
            rt: Arc::new(rt),
            inner: StacClient::new(catalog, options)?,
        })
    }

    pub fn catalog(&self) -> &StacCatalog {
        self.inner.catalog()
    }

    /// First page of a search (blocking).
    pub fn search(&self, params: &StacSearchParams) -> Result<StacItemCollection> {
        self.rt.block_on(self.inner.search(params))
    }

    /// Page following `page` (blocking).
    pub fn next_page(
        &self,
        page: &StacItemCollection,
        params: &StacSearchParams,
    ) -> Result<Option<StacItemCollection>> {
        self.rt.block_on(self.inner.next_page(page, params))
    }

    /// Run a search and iterate over every matching item.
    ///
    /// Only the first page is fetched here; later pages are requested as
    /// the iterator reaches them.
    pub fn items(&self, params: StacSearchParams) -> Result<ItemIter> {
        let first = self.search(&params)?;
        Ok(ItemIter::new(self.clone(), params, first))
    }
}

/// Lazily paginated search results.
pub struct ItemIter {
    client: StacClientBlocking,
    params: StacSearchParams,
    matched: Option<u64>,
    current: IntoIter<StacItem>,
    next: Option<StacItemCollection>,
    failed: bool,
}

impl ItemIter {
    fn new(client: StacClientBlocking, params: StacSearchParams, mut page: StacItemCollection) -> Self {
        let features = std::mem::take(&mut page.features);
        Self {
            client,
            params,
            matched: page.matched(),
            current: features.into_iter(),
            next: Some(page),
            failed: false,
        }
    }

    /// Matched count reported with the first page.
    pub fn matched(&self) -> Option<u64> {
        self.matched
    }
}

impl Iterator for ItemIter {
    type Item = Result<StacItem>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.current.next() {
                return Some(Ok(item));
            }
            if self.failed {
                return None;
            }

            // `next` holds the last page (features already taken) for its links
            let page = self.next.take()?;
            match self.client.next_page(&page, &self.params) {
                Ok(Some(mut following)) => {
                    if following.is_empty() {
                        return None;
                    }
                    self.current = std::mem::take(&mut following.features).into_iter();
                    self.next = Some(following);
                }
                Ok(None) => return None,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
