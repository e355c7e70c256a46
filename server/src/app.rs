//! HTTP surface: health and voice probes plus the `/narrate` upgrade.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::session::SessionDeps;
use crate::transport::serve_socket;

/// Shared application state. One [`SessionDeps`] template is cloned
/// per connection; the history handle inside it is shared, so every
/// session sees the same narration history.
#[derive(Clone)]
pub struct AppState {
    pub deps: SessionDeps,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/voices", get(voices))
        .route("/narrate", get(narrate))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(Arc::new(state))
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "ready": state.deps.server_ready.load(Ordering::Relaxed),
    }))
}

async fn voices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.deps.synthesizer.registry().status_map())
}

async fn narrate(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    info!("websocket upgrade on /narrate");
    let deps = state.deps.clone();
    ws.on_upgrade(move |socket| serve_socket(socket, deps))
}
