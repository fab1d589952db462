use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

pub struct NewMessage<'a> {
    pub chat_id: &'a str,
    pub sender_id: &'a str,
    pub receiver_id: &'a str,
    pub text: &'a str,
    pub title: &'a str,
    pub at: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    UnexpectedError,
}

pub type Result<T> = std::result::Result<T, Error>;

#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Upserts the thread summary and stores the message in one transaction.
    /// Returns the new message id.
    async fn append_message(&self, message: NewMessage<'_>) -> Result<String>;
}

pub struct PgChatStore {
    pool: PgPool,
}

impl PgChatStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatStore for PgChatStore {
    async fn append_message(&self, message: NewMessage<'_>) -> Result<String> {
        let mut tx = self.pool.begin().await.map_err(|err| {
            tracing::error!("Failed to start database transaction: {}", err);
            Error::UnexpectedError
        })?;

        sqlx::query(
            "
            INSERT INTO chats (
                id,
                participant_ids,
                title,
                last_message,
                last_sender_id,
                last_message_at,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $6, $6)
            ON CONFLICT (id) DO UPDATE SET
                participant_ids = EXCLUDED.participant_ids,
                title = EXCLUDED.title,
                last_message = EXCLUDED.last_message,
                last_sender_id = EXCLUDED.last_sender_id,
                last_message_at = EXCLUDED.last_message_at,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(message.chat_id)
        .bind(vec![
            message.sender_id.to_string(),
            message.receiver_id.to_string(),
        ])
        .bind(message.title)
        .bind(message.text)
        .bind(message.sender_id)
        .bind(message.at)
        .execute(&mut *tx)
        .await
        .map_err(|err| {
            tracing::error!(
                "Error occurred while trying to upsert chat {}: {}",
                message.chat_id,
                err
            );
            Error::UnexpectedError
        })?;

        let id = ulid::Ulid::new().to_string();

        sqlx::query(
            "
            INSERT INTO chat_messages (
                id,
                chat_id,
                sender_id,
                text,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(&id)
        .bind(message.chat_id)
        .bind(message.sender_id)
        .bind(message.text)
        .bind(message.at)
        .execute(&mut *tx)
        .await
        .map_err(|err| {
            tracing::error!(
                "Error occurred while trying to create message in chat {}: {}",
                message.chat_id,
                err
            );
            Error::UnexpectedError
        })?;

        tx.commit().await.map_err(|err| {
            tracing::error!("Failed to commit database transaction: {}", err);
            Error::UnexpectedError
        })?;

        Ok(id)
    }
}
