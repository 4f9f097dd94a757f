// src/sources/http.rs
//! Live retrieval: GET the catalog search page, then hand the body to a
//! site-specific [`PageParser`]. Status and transport failures stay typed.

use async_trait::async_trait;
use std::sync::Arc;

use super::{Catalog, FetchContext, ListingExtractor};
use crate::error::FetchError;
use crate::types::RawListing;

/// Turns one rendered search page into listings.
pub trait PageParser: Send + Sync {
    fn parse(&self, catalog: Catalog, page: &str) -> Result<Vec<RawListing>, FetchError>;
}

pub struct HttpExtractor {
    parser: Arc<dyn PageParser>,
}

impl HttpExtractor {
    pub fn new(parser: Arc<dyn PageParser>) -> Self {
        Self { parser }
    }
}

#[async_trait]
impl ListingExtractor for HttpExtractor {
    async fn extract(
        &self,
        ctx: &FetchContext,
        catalog: Catalog,
        query_url: &str,
        _component: &str,
    ) -> Result<Vec<RawListing>, FetchError> {
        let mut req = ctx.client().get(query_url);
        for (k, v) in catalog.extra_headers() {
            req = req.header(*k, *v);
        }
        let resp = req.send().await.map_err(FetchError::http)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }
        let page = resp.text().await.map_err(FetchError::http)?;

        if let Some(marker) = catalog.no_results_marker() {
            if page.contains(marker) {
                tracing::debug!(target: "sources", site = catalog.name(), "catalog reported no results");
                return Err(FetchError::NoResults);
            }
        }
        self.parser.parse(catalog, &page)
    }
}
