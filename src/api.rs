use axum::{
    extract::{Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::cache::Provenance;
use crate::orchestrator::Stage;
use crate::service::LookupService;
use crate::summarize::{summarize_or_not_found, DynSummarizer, Summary};
use crate::types::Category;

pub const CACHE_HEADER: &str = "x-lookup-cache";

#[derive(Clone)]
pub struct AppState {
    pub service: LookupService,
    pub summarizer: DynSummarizer,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/lookup", get(lookup))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct LookupQuery {
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    hint: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    summarize: bool,
}

#[derive(Debug, Serialize)]
struct LookupResp {
    subject: String,
    category: Category,
    found: bool,
    text: String,
    provenance: Option<Provenance>,
    stages: Vec<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
}

#[derive(Debug, Serialize)]
struct ErrorResp {
    error: String,
}

fn bad_request(msg: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResp { error: msg.into() })).into_response()
}

async fn lookup(State(state): State<AppState>, Query(q): Query<LookupQuery>) -> Response {
    let subject = q.subject.as_deref().unwrap_or_default().trim();
    if subject.is_empty() {
        return bad_request("subject must not be empty");
    }
    let category = match q.category.as_deref() {
        None | Some("") => Category::Individual,
        Some(raw) => match raw.parse::<Category>() {
            Ok(c) => c,
            Err(e) => return bad_request(e.to_string()),
        },
    };
    let hint = q.hint.as_deref().map(str::trim).filter(|h| !h.is_empty());

    let outcome = state.service.lookup(subject, hint, category).await;

    let summary = if q.summarize {
        summarize_or_not_found(state.summarizer.as_ref(), subject, &outcome.text).await
    } else {
        None
    };

    let cache = if outcome.cache_hit { "HIT" } else { "MISS" };
    let body = LookupResp {
        subject: subject.to_string(),
        category,
        found: outcome.found(),
        text: outcome.text,
        provenance: outcome.provenance,
        stages: outcome.stages,
        summary,
    };

    (
        [(HeaderName::from_static(CACHE_HEADER), HeaderValue::from_static(cache))],
        Json(body),
    )
        .into_response()
}
