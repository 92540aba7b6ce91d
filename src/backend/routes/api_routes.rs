/**
 * API Route Configuration
 *
 * # Routes
 *
 * ## Users
 * - `POST /user` - Register a user
 * - `GET /user/{id}` - Look up a user
 *
 * ## Operations
 * - `GET /health` - Liveness and this process's backend identity
 */

use axum::{extract::State, response::Json, Router};
use serde_json::{json, Value};

use crate::backend::server::state::AppState;
use crate::backend::users::{handle_create_user, handle_get_user};

pub fn configure_api_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/user", axum::routing::post(handle_create_user))
        .route("/user/{id}", axum::routing::get(handle_get_user))
        .route("/health", axum::routing::get(health))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "backend_id": state.backend_id().as_str(),
    }))
}
