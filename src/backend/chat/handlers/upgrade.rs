/**
 * WebSocket Upgrade Handler
 *
 * `GET /ws?user={id}&to={id}`
 *
 * The `Connecting` step of a session: both ids must parse as integers and
 * name existing users before the connection is upgraded. A rejected request
 * gets a JSON error body and leaves no registry or directory entry behind.
 *
 * | Condition                          | Status |
 * |------------------------------------|--------|
 * | `user` or `to` missing/non-integer | 400    |
 * | unknown user                       | 400    |
 * | user lookup failed                 | 500    |
 * | not a WebSocket upgrade request    | axum's upgrade rejection |
 */

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::backend::chat::session::Session;
use crate::backend::error::BackendError;
use crate::backend::repository::RepositoryError;
use crate::backend::server::state::AppState;
use crate::shared::UserId;

/// Raw query parameters; parsed by hand so malformed ids get a clear message.
#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub user: Option<String>,
    pub to: Option<String>,
}

fn parse_id(name: &str, raw: Option<&str>) -> Result<UserId, BackendError> {
    let raw = raw.ok_or_else(|| BackendError::bad_request(format!("missing '{}' parameter", name)))?;
    raw.trim()
        .parse::<UserId>()
        .map_err(|_| BackendError::bad_request(format!("invalid '{}' id: {}", name, raw)))
}

async fn ensure_user(state: &AppState, name: &str, id: UserId) -> Result<(), BackendError> {
    match state.users.get_user(id).await {
        Ok(_) => Ok(()),
        Err(RepositoryError::NotFound(_)) => Err(BackendError::bad_request(format!(
            "unknown '{}' user: {}",
            name, id
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Validate the pair, then upgrade and hand the socket to a new session.
pub async fn handle_ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, BackendError> {
    let from = parse_id("user", query.user.as_deref())?;
    let to = parse_id("to", query.to.as_deref())?;

    ensure_user(&state, "user", from).await?;
    ensure_user(&state, "to", to).await?;

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    tracing::debug!(user_id = from, to_user_id = to, "[Session] Upgrading connection");

    let tasks = state.tasks.clone();
    Ok(upgrade
        .on_failed_upgrade(move |e| {
            tracing::warn!(user_id = from, error = %e, "[Session] Upgrade failed");
        })
        .on_upgrade(move |socket| {
            let session = Session::new(state, from, to);
            tasks.track_future(session.run(socket))
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("user", Some("42")).unwrap(), 42);
        assert_eq!(parse_id("user", Some(" -7 ")).unwrap(), -7);

        let err = parse_id("user", Some("abc")).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "invalid 'user' id: abc");

        let err = parse_id("to", None).unwrap_err();
        assert_eq!(err.message(), "missing 'to' parameter");
    }
}
