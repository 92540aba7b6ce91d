/**
 * Chat Route Configuration
 *
 * - `GET /ws` - WebSocket session upgrade
 * - `POST /internal/redirect` - messages forwarded by peer backends
 * - `GET /messages` - stored message history
 */

use axum::Router;

use crate::backend::chat::handlers::{handle_list_messages, handle_redirect, handle_ws_upgrade};
use crate::backend::realtime::router::REDIRECT_PATH;
use crate::backend::server::state::AppState;

pub fn configure_chat_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/ws", axum::routing::get(handle_ws_upgrade))
        .route(REDIRECT_PATH, axum::routing::post(handle_redirect))
        .route("/messages", axum::routing::get(handle_list_messages))
}
