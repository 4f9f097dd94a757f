// src/sources/fixture.rs
//! Canned listings, keyed by site and requested component.
//!
//! JSON shape:
//! {
//!   "Prom": {
//!     "Процесор Intel i5-10400": [ { "name": "...", "price": "5000 грн" } ],
//!     "Відеокарта RTX 4070": { "error": "notFound" }
//!   }
//! }

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::{Catalog, FetchContext, ListingExtractor};
use crate::error::FetchError;
use crate::types::RawListing;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FixtureEntry {
    Listings(Vec<RawListing>),
    Failure { error: String },
}

#[derive(Debug, Clone, Default)]
pub struct FixtureExtractor {
    // site name (lowercase) -> component -> entry
    pages: HashMap<String, HashMap<String, FixtureEntry>>,
}

impl FixtureExtractor {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let raw: HashMap<String, HashMap<String, FixtureEntry>> =
            serde_json::from_str(s).context("parsing listing snapshot json")?;
        let pages = raw
            .into_iter()
            .map(|(site, entries)| (site.to_lowercase(), entries))
            .collect();
        Ok(Self { pages })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading listing snapshot from {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn with_listings(mut self, site: &str, component: &str, listings: Vec<RawListing>) -> Self {
        self.insert(site, component, FixtureEntry::Listings(listings));
        self
    }

    pub fn with_failure(mut self, site: &str, component: &str, error: &str) -> Self {
        self.insert(
            site,
            component,
            FixtureEntry::Failure {
                error: error.to_string(),
            },
        );
        self
    }

    fn insert(&mut self, site: &str, component: &str, entry: FixtureEntry) {
        self.pages
            .entry(site.to_lowercase())
            .or_default()
            .insert(component.to_string(), entry);
    }
}

#[async_trait]
impl ListingExtractor for FixtureExtractor {
    async fn extract(
        &self,
        _ctx: &FetchContext,
        catalog: Catalog,
        _query_url: &str,
        component: &str,
    ) -> Result<Vec<RawListing>, FetchError> {
        let entry = self
            .pages
            .get(&catalog.name().to_lowercase())
            .and_then(|m| m.get(component));
        match entry {
            None => Ok(Vec::new()),
            Some(FixtureEntry::Listings(v)) => Ok(v.clone()),
            Some(FixtureEntry::Failure { error }) if error == "notFound" => {
                Err(FetchError::NoResults)
            }
            Some(FixtureEntry::Failure { error }) => Err(FetchError::extraction(error.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "Prom": {
            "Процесор Intel i5-10400": [
                { "name": "Процесор Intel Core i5-10400F", "price": "5000 грн", "link": "https://prom.ua/p1" }
            ],
            "Відеокарта RTX 4070": { "error": "notFound" }
        },
        "kyivtech": {
            "Сервер Dell R740": { "error": "selector .product-thumb missing" }
        }
    }"#;

    #[tokio::test]
    async fn serves_listings_by_site_and_component() {
        let fx = FixtureExtractor::from_json(SNAPSHOT).unwrap();
        let ctx = FetchContext::default();
        let got = fx
            .extract(&ctx, Catalog::Prom, "", "Процесор Intel i5-10400")
            .await
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].price, "5000 грн");
        assert_eq!(got[0].availability, crate::types::AVAILABILITY_UNSPECIFIED);

        let missing = fx.extract(&ctx, Catalog::Servak, "", "anything").await.unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn failure_entries_map_to_fetch_errors() {
        let fx = FixtureExtractor::from_json(SNAPSHOT).unwrap();
        let ctx = FetchContext::default();
        let nf = fx.extract(&ctx, Catalog::Prom, "", "Відеокарта RTX 4070").await;
        assert_eq!(nf, Err(FetchError::NoResults));
        let ex = fx.extract(&ctx, Catalog::Kyivtech, "", "Сервер Dell R740").await;
        assert!(matches!(ex, Err(FetchError::Extraction { .. })));
    }

    #[test]
    fn shipped_snapshot_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/snapshot.json");
        let fx = FixtureExtractor::from_path(&path).unwrap();
        assert!(fx.pages.contains_key("servak"));
    }

    #[test]
    fn rejects_malformed_snapshot() {
        assert!(FixtureExtractor::from_json("[1, 2]").is_err());
    }
}
