mod dispatch;

pub use dispatch::{Dispatcher, Message, MessageResponse};

use crate::engine::{matcher, ResourceType, RuleEngine};
use crate::state::{BlockingState, ProtectionConfig};
use crate::store::KeyValueStore;
use anyhow::{Context, Result};
use axum::{
    extract::{Json as AxumJson, Query, State},
    http::{header, StatusCode, Uri},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rust_embed::RustEmbed;
use std::sync::Arc;

#[derive(RustEmbed)]
#[folder = "$OUT_DIR/ui"]
struct Asset;

struct ApiState {
    dispatcher: Arc<Dispatcher>,
    store: Arc<dyn KeyValueStore>,
    engine: Arc<dyn RuleEngine>,
}

pub fn router(
    dispatcher: Arc<Dispatcher>,
    store: Arc<dyn KeyValueStore>,
    engine: Arc<dyn RuleEngine>,
) -> Router {
    let state = Arc::new(ApiState {
        dispatcher,
        store,
        engine,
    });

    Router::new()
        .route("/api/message", post(handle_message))
        .route("/api/state", get(get_state))
        .route("/api/rules", get(get_rules))
        .route("/api/check", get(check_url))
        .fallback(static_handler)
        .with_state(state)
}

pub async fn start_api_server(
    dispatcher: Arc<Dispatcher>,
    store: Arc<dyn KeyValueStore>,
    engine: Arc<dyn RuleEngine>,
    addr: std::net::SocketAddr,
) -> Result<()> {
    let app = router(dispatcher, store, engine);
    tracing::info!("API Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API listener on {}", addr))?;
    axum::serve(listener, app).await.context("API server failed")?;
    Ok(())
}

async fn handle_message(
    State(state): State<Arc<ApiState>>,
    AxumJson(message): AxumJson<Message>,
) -> impl IntoResponse {
    Json(state.dispatcher.handle(message).await)
}

async fn get_state(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let blocking = BlockingState::load(state.store.as_ref()).await;
    let protection = ProtectionConfig::load(state.store.as_ref()).await;
    match (blocking, protection) {
        (Ok(blocking), Ok(protection)) => Json(serde_json::json!({
            "blocking": blocking,
            "protection_enabled": protection.is_enabled(),
        }))
        .into_response(),
        (Err(e), _) | (_, Err(e)) => error_response(e),
    }
}

async fn get_rules(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    match state.engine.installed_rules().await {
        Ok(rules) => Json(rules).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(serde::Deserialize)]
struct CheckQuery {
    url: String,
}

async fn check_url(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<CheckQuery>,
) -> impl IntoResponse {
    match state.engine.installed_rules().await {
        Ok(rules) => {
            let hit = matcher::first_match(&rules, &query.url, ResourceType::MainFrame);
            Json(serde_json::json!({
                "url": query.url,
                "blocked": hit.is_some(),
                "rule_id": hit.map(|r| r.id),
                "redirect": hit.map(|r| r.redirect_url()),
            }))
            .into_response()
        }
        Err(e) => error_response(e),
    }
}

fn error_response(e: crate::error::BlockerError) -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(MessageResponse::failed(e)),
    )
        .into_response()
}

async fn static_handler(uri: Uri) -> impl IntoResponse {
    let path = uri.path().trim_start_matches('/');
    let path = if path.is_empty() { "blocked.html" } else { path };

    match Asset::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref())], content.data).into_response()
        }
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}
