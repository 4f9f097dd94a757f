// src/lib.rs
// Public library surface for the service binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod matcher;
pub mod metrics;
pub mod normalize;
pub mod sources;
pub mod thresholds;
pub mod types;

use anyhow::Result;
use std::sync::Arc;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{aggregate, AggregatedResult, ComponentResult, FailurePolicy};
pub use crate::api::{create_router, AppState};
pub use crate::config::EngineConfig;
pub use crate::dispatch::{dispatch, Dispatcher, TaskKey, TaskOutcome, TaskStatus};
pub use crate::engine::{resolve_components, MatchEngine, MatchReport};
pub use crate::error::FetchError;
pub use crate::fallback::FallbackLink;
pub use crate::sources::{catalog_sources, Catalog, FetchContext, SourceAdapter};
pub use crate::types::{FallbackRecord, MatchedRecord, NotFoundRecord, RawListing, SiteRecord};

/// Engine over every known catalog, using threshold overrides from the
/// default config lookup.
pub fn build_engine(
    extractor: Arc<dyn sources::ListingExtractor>,
    cfg: &EngineConfig,
) -> Result<MatchEngine> {
    let overrides = config::load_thresholds_default()?;
    if !overrides.is_empty() {
        let names: Vec<&str> = overrides.keys().map(|c| c.name()).collect();
        tracing::info!(catalogs = ?names, "threshold overrides loaded");
    }
    MatchEngine::new(catalog_sources(extractor, &overrides), cfg)
}
