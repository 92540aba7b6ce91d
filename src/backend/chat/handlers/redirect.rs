/**
 * Redirect Handler
 *
 * `POST /internal/redirect` with body `{"message", "to_user_id", "from_user_id"?}`
 *
 * Receives messages forwarded by peer backends whose directory lookup named
 * this process as the recipient's owner, and enqueues them on the recipient's
 * local channel.
 *
 * | Outcome                                   | Status |
 * |-------------------------------------------|--------|
 * | enqueued                                  | 200    |
 * | recipient not connected to this backend   | 404    |
 * | queue full past the redirect timeout      | 503    |
 * | queue closed or server shutting down      | 503    |
 * | body not JSON / wrong shape               | 400 / 415 / 422 |
 */

use axum::{extract::State, http::StatusCode, Json};

use crate::backend::error::BackendError;
use crate::backend::realtime::ChannelError;
use crate::backend::server::state::AppState;
use crate::shared::MessageRedirect;

pub async fn handle_redirect(
    State(state): State<AppState>,
    Json(redirect): Json<MessageRedirect>,
) -> Result<StatusCode, BackendError> {
    let to = redirect.to_user_id;

    let Some(channel) = state.registry.get(to) else {
        tracing::debug!(to_user_id = to, "[Redirect] Recipient not connected here");
        return Err(BackendError::not_found(format!("user {} is not connected to this backend", to)));
    };

    let cancel = state.shutdown.child_token();
    let timeout = state.config.redirect_timeout();

    match tokio::time::timeout(timeout, channel.send(redirect.into_push(), &cancel)).await {
        Ok(Ok(())) => {
            tracing::debug!(to_user_id = to, "[Redirect] Enqueued");
            Ok(StatusCode::OK)
        }
        Ok(Err(ChannelError::Closed)) => {
            Err(BackendError::unavailable(format!("channel for user {} is closed", to)))
        }
        Ok(Err(ChannelError::Cancelled)) => Err(BackendError::unavailable("server shutting down")),
        Err(_) => {
            tracing::warn!(to_user_id = to, "[Redirect] Local queue full, giving up");
            Err(BackendError::unavailable(format!("queue for user {} is full", to)))
        }
    }
}
