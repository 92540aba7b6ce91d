/**
 * Postgres Repository
 *
 * sqlx-backed implementation of the user and message repositories. Schema
 * lives in `migrations/` and is applied at start-up.
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{MessageRepository, RepositoryError, StoredMessage, User, UserRepository};
use crate::shared::UserId;

/// Postgres SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION)
    )
}

#[async_trait]
impl UserRepository for PgRepository {
    async fn get_user(&self, id: UserId) -> Result<User, RepositoryError> {
        let row: Option<(i64, String)> = sqlx::query_as(
            r#"
            SELECT id, username
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, username)| User { id, username })
            .ok_or(RepositoryError::NotFound("user"))
    }

    async fn create_user(&self, username: &str) -> Result<UserId, RepositoryError> {
        let result: Result<(i64,), sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO users (username)
            VALUES ($1)
            RETURNING id
            "#,
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok((id,)) => Ok(id),
            Err(e) if is_unique_violation(&e) => Err(RepositoryError::AlreadyExists("user")),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl MessageRepository for PgRepository {
    async fn create_message(
        &self,
        from: UserId,
        to: UserId,
        text: &str,
    ) -> Result<i64, RepositoryError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO messages (from_id, to_id, message)
            VALUES ($1, $2, $3)
            RETURNING message_id
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn list_messages(
        &self,
        from: UserId,
        to: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct MessageRow {
            message_id: i64,
            from_id: i64,
            to_id: i64,
            message: String,
            stored_at: DateTime<Utc>,
        }

        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT message_id, from_id, to_id, message, stored_at
            FROM messages
            WHERE from_id = $1 AND to_id = $2 AND stored_at > $3
            ORDER BY stored_at ASC, message_id ASC
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| StoredMessage {
                id: row.message_id,
                from_id: row.from_id,
                to_id: row.to_id,
                message: row.message,
                stored_at: row.stored_at,
            })
            .collect())
    }
}
