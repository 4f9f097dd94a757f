// src/sources/mod.rs
//! Catalog boundary: every source exposes how to build its search locator,
//! how to retrieve raw listings, and the policy its listings are matched with.
//! Page rendering and DOM extraction sit behind [`ListingExtractor`].

pub mod catalog;
pub mod fixture;
pub mod http;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchError;
use crate::matcher::MatchPolicy;
use crate::thresholds::ThresholdTable;
use crate::types::RawListing;

pub use catalog::Catalog;
pub use fixture::FixtureExtractor;
pub use http::{HttpExtractor, PageParser};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Shared retrieval sessions. The client pools and recycles connections;
/// tasks borrow it and never assume a connection outlives them.
#[derive(Clone, Debug)]
pub struct FetchContext {
    client: reqwest::Client,
}

impl FetchContext {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .context("building catalog http client")?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl Default for FetchContext {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Canonical site name, stamped on every record this source produces.
    fn name(&self) -> &str;

    /// Search locator for a requested component.
    fn build_query(&self, component: &str) -> String;

    fn policy(&self) -> &MatchPolicy;

    /// Wall-clock budget for one retrieval.
    fn time_budget(&self) -> Duration {
        Duration::from_secs(10)
    }

    async fn fetch_listings(
        &self,
        ctx: &FetchContext,
        component: &str,
    ) -> Result<Vec<RawListing>, FetchError>;
}

/// Black-box page extraction: turns a catalog search locator into raw listings.
#[async_trait]
pub trait ListingExtractor: Send + Sync {
    async fn extract(
        &self,
        ctx: &FetchContext,
        catalog: Catalog,
        query_url: &str,
        component: &str,
    ) -> Result<Vec<RawListing>, FetchError>;
}

/// A concrete catalog wired to an extractor and its injected match policy.
pub struct CatalogSource {
    catalog: Catalog,
    policy: MatchPolicy,
    budget: Duration,
    extractor: Arc<dyn ListingExtractor>,
}

impl CatalogSource {
    pub fn new(catalog: Catalog, extractor: Arc<dyn ListingExtractor>) -> Self {
        Self {
            catalog,
            policy: catalog.default_policy(),
            budget: catalog.time_budget(),
            extractor,
        }
    }

    pub fn with_thresholds(mut self, thresholds: ThresholdTable) -> Self {
        self.policy = self.policy.with_thresholds(thresholds);
        self
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn catalog(&self) -> Catalog {
        self.catalog
    }
}

#[async_trait]
impl SourceAdapter for CatalogSource {
    fn name(&self) -> &str {
        self.catalog.name()
    }

    fn build_query(&self, component: &str) -> String {
        self.catalog.query_url(component)
    }

    fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    fn time_budget(&self) -> Duration {
        self.budget
    }

    async fn fetch_listings(
        &self,
        ctx: &FetchContext,
        component: &str,
    ) -> Result<Vec<RawListing>, FetchError> {
        let url = self.build_query(component);
        tracing::debug!(target: "sources", site = self.name(), %url, "fetching listings");
        self.extractor
            .extract(ctx, self.catalog, &url, component)
            .await
    }
}

/// Build every known catalog in registry order, applying threshold overrides.
pub fn catalog_sources(
    extractor: Arc<dyn ListingExtractor>,
    overrides: &HashMap<Catalog, ThresholdTable>,
) -> Vec<Arc<dyn SourceAdapter>> {
    Catalog::ALL
        .iter()
        .map(|&c| {
            let mut src = CatalogSource::new(c, Arc::clone(&extractor));
            if let Some(t) = overrides.get(&c) {
                src = src.with_thresholds(t.clone());
            }
            Arc::new(src) as Arc<dyn SourceAdapter>
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registry_builds_all_catalogs_in_order() {
        let sources = catalog_sources(Arc::new(FixtureExtractor::empty()), &HashMap::new());
        let names: Vec<&str> = sources.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["Prom", "HardKiev", "Server-Shop", "Servak", "Kyivtech", "HWF", "ServerParts"]
        );
    }

    #[tokio::test]
    async fn overrides_replace_catalog_table() {
        let mut overrides = HashMap::new();
        overrides.insert(Catalog::Prom, ThresholdTable::new(0.5).with("процесор", 0.6));
        let sources = catalog_sources(Arc::new(FixtureExtractor::empty()), &overrides);
        let prom = &sources[0];
        assert!((prom.policy().thresholds.threshold_for("Процесор Intel") - 0.6).abs() < 1e-9);
        assert!((prom.policy().thresholds.threshold_for("Сервер Dell") - 0.5).abs() < 1e-9);
        // untouched catalogs keep their built-in table
        assert!((sources[3].policy().thresholds.threshold_for("Процесор Intel") - 0.97).abs() < 1e-9);
    }
}
