/**
 * Router Configuration
 *
 * Combines all route groups into a single Axum router.
 *
 * # Route Groups
 *
 * 1. Chat routes (WebSocket upgrade, inter-backend redirect, history)
 * 2. API routes (users, health)
 * 3. Fallback handler (404)
 *
 * Every request runs inside a `TraceLayer` span.
 */

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::routes::chat_routes::configure_chat_routes;
use crate::backend::server::state::AppState;

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router<()> {
    let router = Router::new();

    let router = configure_chat_routes(router);
    let router = configure_api_routes(router);

    // Fallback handler for 404
    let router = router.fallback(|| async { (axum::http::StatusCode::NOT_FOUND, "404 Not Found") });

    router.layer(TraceLayer::new_for_http()).with_state(app_state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::backend::server::build_app;
    use crate::backend::server::config::Repositories;
    use crate::backend::store::MemoryStore;
    use crate::shared::AppConfig;

    #[tokio::test]
    async fn test_fallback_and_health() {
        let config = AppConfig::builder()
            .advertise_addr("127.0.0.1:1")
            .build()
            .unwrap();
        let app = build_app(config, Arc::new(MemoryStore::new()), Repositories::in_memory())
            .await
            .unwrap();

        let response = app
            .routes
            .clone()
            .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .routes
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        app.shutdown(Duration::from_secs(1)).await;
    }
}
