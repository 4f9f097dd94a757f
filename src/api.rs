use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::engine::{MatchEngine, MatchReport};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MatchEngine>,
}

impl AppState {
    pub fn new(engine: MatchEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/sources", get(list_sources))
        .route("/parse", post(parse))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ParseReq {
    Object { components: Vec<String> },
    List(Vec<String>),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn bad_request(msg: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody { error: msg.into() }),
    )
}

#[derive(Serialize)]
struct SourceInfo {
    name: String,
    budget_ms: u64,
}

async fn list_sources(State(state): State<AppState>) -> Json<Vec<SourceInfo>> {
    let out = state
        .engine
        .sources()
        .iter()
        .map(|s| SourceInfo {
            name: s.name().to_string(),
            budget_ms: s.time_budget().as_millis() as u64,
        })
        .collect();
    Json(out)
}

async fn parse(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<MatchReport>, ApiError> {
    let components = read_components(&headers, &body)?;
    if components.is_empty() {
        return Err(bad_request("no components supplied"));
    }
    Ok(Json(state.engine.run(&components).await))
}

/// JSON (`{"components": [...]}` or a bare array) or plain text, one component per line.
fn read_components(headers: &HeaderMap, body: &[u8]) -> Result<Vec<String>, ApiError> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    let raw: Vec<String> = if is_json {
        match serde_json::from_slice::<ParseReq>(body) {
            Ok(ParseReq::Object { components }) | Ok(ParseReq::List(components)) => components,
            Err(e) => return Err(bad_request(format!("invalid json body: {e}"))),
        }
    } else {
        let text = std::str::from_utf8(body).map_err(|_| bad_request("body is not utf-8"))?;
        text.lines().map(str::to_string).collect()
    };

    Ok(raw
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect())
}
