// src/engine.rs
//! Top-level entry point: ordered components in, aggregated result out.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::aggregate::{aggregate, AggregatedResult, FailurePolicy};
use crate::config::EngineConfig;
use crate::dispatch::{Dispatcher, TaskOutcome};
use crate::fallback::FallbackLink;
use crate::sources::{FetchContext, SourceAdapter};

/// One parse request's full answer, with the per-task evidence behind it.
#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    #[serde(flatten)]
    pub result: AggregatedResult,
    pub outcomes: Vec<TaskOutcome>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

pub struct MatchEngine {
    sources: Vec<Arc<dyn SourceAdapter>>,
    dispatcher: Dispatcher,
    failure_policy: FailurePolicy,
    fallback: Option<FallbackLink>,
}

impl MatchEngine {
    pub fn new(sources: Vec<Arc<dyn SourceAdapter>>, cfg: &EngineConfig) -> Result<Self> {
        let ctx = FetchContext::new(&cfg.user_agent)?;
        Ok(Self::with_context(sources, cfg, ctx))
    }

    pub fn with_context(
        sources: Vec<Arc<dyn SourceAdapter>>,
        cfg: &EngineConfig,
        ctx: FetchContext,
    ) -> Self {
        Self {
            sources,
            dispatcher: Dispatcher::new(cfg.max_concurrency)
                .with_context(ctx)
                .with_budget(cfg.task_budget),
            failure_policy: cfg.failure_policy,
            fallback: cfg.fallback_link.then(FallbackLink::ebay),
        }
    }

    pub fn sources(&self) -> &[Arc<dyn SourceAdapter>] {
        &self.sources
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub async fn run(&self, components: &[String]) -> MatchReport {
        let started_at = Utc::now();
        let t0 = Instant::now();
        let mut outcomes = self.dispatcher.dispatch(components, &self.sources).await;
        outcomes.sort_by_key(|o| o.key);
        let mut result = aggregate(components, &outcomes, self.failure_policy);
        if let Some(link) = &self.fallback {
            result.append_fallback(link);
        }
        let elapsed_ms = t0.elapsed().as_millis() as u64;
        tracing::info!(
            target: "dispatch",
            components = components.len(),
            sources = self.sources.len(),
            found = result.found_count(),
            failures = result.failures.len(),
            elapsed_ms,
            "parse request resolved"
        );
        MatchReport {
            result,
            outcomes,
            started_at,
            elapsed_ms,
        }
    }

    pub async fn resolve(&self, components: &[String]) -> AggregatedResult {
        self.run(components).await.result
    }
}

/// Dispatch and aggregate with default settings and the omit failure policy.
pub async fn resolve_components(
    components: &[String],
    sources: &[Arc<dyn SourceAdapter>],
    max_concurrency: usize,
) -> AggregatedResult {
    let outcomes = crate::dispatch::dispatch(components, sources, max_concurrency).await;
    aggregate(components, &outcomes, FailurePolicy::Omit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{catalog_sources, FixtureExtractor};
    use crate::types::RawListing;
    use std::collections::HashMap;

    #[tokio::test]
    async fn report_carries_every_task() {
        let fx = FixtureExtractor::empty()
            .with_listings(
                "Servak",
                "Сервер Dell PowerEdge R740",
                vec![RawListing::new("Сервер Dell PowerEdge R740", "85000 грн")],
            )
            .with_failure("Kyivtech", "Сервер Dell PowerEdge R740", "notFound");
        let sources = catalog_sources(Arc::new(fx), &HashMap::new());
        let engine = MatchEngine::with_context(sources, &EngineConfig::default(), FetchContext::default());
        let comps = vec!["Сервер Dell PowerEdge R740".to_string()];

        let report = engine.run(&comps).await;
        assert_eq!(report.outcomes.len(), 7);
        let entry = report.result.get("Сервер Dell PowerEdge R740").unwrap();
        // Kyivtech failed and is omitted under the default policy
        assert_eq!(entry.results.len(), 6);
        assert!(entry.results.iter().all(|r| r.site() != "Kyivtech"));
        assert_eq!(report.result.failures.len(), 1);
        assert_eq!(report.result.failures[0].reason, "notFound");
        let servak = entry.results.iter().find(|r| r.site() == "Servak").unwrap();
        assert!(servak.is_found());

        let v = serde_json::to_value(&report).unwrap();
        assert!(v["results"].is_array());
        assert!(v["outcomes"].is_array());
    }

    #[tokio::test]
    async fn fallback_link_closes_each_component() {
        let fx = FixtureExtractor::empty().with_listings(
            "Servak",
            "Сервер Dell PowerEdge R740",
            vec![RawListing::new("Сервер Dell PowerEdge R740", "85000 грн")],
        );
        let sources = catalog_sources(Arc::new(fx), &HashMap::new());
        let cfg = EngineConfig {
            fallback_link: true,
            ..EngineConfig::default()
        };
        let engine = MatchEngine::with_context(sources, &cfg, FetchContext::default());
        let comps = vec![
            "Сервер Dell PowerEdge R740".to_string(),
            "Відеокарта RTX 4070".to_string(),
        ];

        let report = engine.run(&comps).await;
        assert_eq!(report.outcomes.len(), 14);
        for entry in &report.result.components {
            assert_eq!(entry.results.len(), 8);
            let last = entry.results.last().unwrap();
            assert_eq!(last.site(), "eBay");
            assert_eq!(last.link(), FallbackLink::ebay().url_for(&entry.name));
        }
        // the link is not a match
        assert_eq!(report.result.found_count(), 1);
    }
}
