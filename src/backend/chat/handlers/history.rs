//! `GET /messages?from={id}&to={id}&since={rfc3339}`
//!
//! Messages stored from `from` to `to` after `since` (exclusive), oldest
//! first. `since` defaults to the Unix epoch.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::backend::error::BackendError;
use crate::backend::repository::StoredMessage;
use crate::backend::server::state::AppState;
use crate::shared::UserId;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub from: UserId,
    pub to: UserId,
    pub since: Option<DateTime<Utc>>,
}

pub async fn handle_list_messages(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<StoredMessage>>, BackendError> {
    let since = query.since.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let messages = state
        .messages
        .list_messages(query.from, query.to, since)
        .await?;
    Ok(Json(messages))
}
