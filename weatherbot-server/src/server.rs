//! HTTP surface: `POST /chat`, plus status and health probes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use weatherbot_core::{ChatRequest, ChatResponse, WeatherChat};

const BAD_REQUEST_REPLY: &str =
    "Please send a JSON body like {\"message\": \"What's the weather in Delhi?\"}.";

#[derive(Clone)]
struct AppState {
    chat: Arc<WeatherChat>,
}

#[derive(Debug, Serialize)]
struct ServiceStatus {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
}

pub fn router(chat: Arc<WeatherChat>) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/health", get(health))
        .route("/chat", post(chat_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { chat })
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(chat: WeatherChat, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {addr}: {e}"))?;

    tracing::info!("Weatherbot listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(Arc::new(chat)))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}

async fn status() -> Json<ServiceStatus> {
    Json(ServiceStatus {
        status: "online",
        service: "Weatherbot",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn health() -> Json<Health> {
    Json(Health { status: "healthy" })
}

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> (StatusCode, Json<ChatResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!("Rejected chat body: {rejection}");
            return (StatusCode::BAD_REQUEST, Json(ChatResponse::new(BAD_REQUEST_REPLY)));
        }
    };

    (StatusCode::OK, Json(state.chat.respond(&request).await))
}
