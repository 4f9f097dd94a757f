//! Parts price matcher: service entrypoint.
//! Boots the Axum HTTP server over an offline listing snapshot.

use std::sync::Arc;

use parts_price_matcher::{
    build_engine, config, create_router, metrics::Metrics, sources::FixtureExtractor, AppState,
    EngineConfig,
};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `LOG_FORMAT=json` switches to structured JSON lines; compact text otherwise.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dispatch=info,sources=info,matcher=warn,info"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    // Shuttle may have installed a subscriber already.
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = EngineConfig::from_env()?;

    let snapshot = config::snapshot_path();
    let extractor = if snapshot.exists() {
        FixtureExtractor::from_path(&snapshot)?
    } else {
        tracing::warn!(path = %snapshot.display(), "listing snapshot missing; every source will report not found");
        FixtureExtractor::empty()
    };

    let engine = build_engine(Arc::new(extractor), &cfg)?;
    tracing::info!(sources = ?engine.source_names(), max_concurrency = cfg.max_concurrency, "engine ready");

    let metrics = Metrics::init(cfg.max_concurrency)?;
    let router = create_router(AppState::new(engine)).merge(metrics.router());

    Ok(router.into())
}
