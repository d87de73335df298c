use std::sync::Arc;

use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use albumsync_import::AlbumSyncService;

use crate::socket;

#[derive(Clone)]
pub struct AppState {
    service: Arc<AlbumSyncService>,
}

pub fn build_router(service: Arc<AlbumSyncService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ws", get(channel))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { service })
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "providers": state.service.sources(),
    }))
}

/// Upgrade to the progress channel. One socket carries any number of
/// concurrent operations, told apart by their `context`.
async fn channel(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| socket::serve(socket, state.service))
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use albumsync_import::{ContentStore, MemoryContentStore};
    use albumsync_providers::testing::MockHttpFetcher;
    use albumsync_providers::{FlickrProvider, ProviderRegistry, ScraperSettings};

    use super::*;

    fn service() -> Arc<AlbumSyncService> {
        let provider = FlickrProvider::new(Arc::new(MockHttpFetcher::new()), None, ScraperSettings::default());
        Arc::new(
            AlbumSyncService::builder()
                .registry(ProviderRegistry::new().with(Arc::new(provider)))
                .store(Arc::new(MemoryContentStore::new()) as Arc<dyn ContentStore>)
                .build(),
        )
    }

    #[tokio::test]
    async fn health_lists_providers() {
        let response = build_router(service())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["providers"], json!(["flickr"]));
    }

    #[tokio::test]
    async fn channel_requires_upgrade() {
        let response = build_router(service())
            .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
