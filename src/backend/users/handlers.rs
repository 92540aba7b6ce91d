/**
 * User Handlers
 *
 * - `POST /user` with `{"username"}` registers a user and returns
 *   `{"id", "username"}` with 201 Created (409 when the name is taken)
 * - `GET /user/{id}` returns `{"id", "username"}` (404 when unknown)
 *
 * # Validation
 *
 * Usernames are trimmed and must be 1-64 characters long.
 */

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use crate::backend::error::BackendError;
use crate::backend::repository::User;
use crate::backend::server::state::AppState;
use crate::shared::{SharedError, UserId};

/// Longest accepted username, in characters.
const MAX_USERNAME_CHARS: usize = 64;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
}

fn validate_username(raw: &str) -> Result<&str, SharedError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(SharedError::validation("username", "must not be empty"));
    }
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(SharedError::validation(
            "username",
            format!("must be at most {} characters", MAX_USERNAME_CHARS),
        ));
    }
    Ok(username)
}

pub async fn handle_create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), BackendError> {
    let username = validate_username(&request.username)?;
    let id = state.users.create_user(username).await?;

    tracing::info!(user_id = id, "[Users] Registered {}", username);

    Ok((
        StatusCode::CREATED,
        Json(User {
            id,
            username: username.to_string(),
        }),
    ))
}

pub async fn handle_get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<User>, BackendError> {
    Ok(Json(state.users.get_user(id).await?))
}
