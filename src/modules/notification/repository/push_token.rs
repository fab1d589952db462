use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    UnexpectedError,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Device tokens a user's apps registered for push notifications.
#[async_trait]
pub trait PushTokenStore: Send + Sync {
    async fn register(&self, user_id: &str, token: &str) -> Result<()>;

    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<String>>;

    async fn delete_many(&self, user_id: &str, tokens: &[String]) -> Result<()>;
}

pub async fn create<'e, E: PgExecutor<'e>>(e: E, user_id: &str, token: &str) -> Result<()> {
    sqlx::query(
        "
        INSERT INTO push_tokens (
            user_id,
            token
        )
        VALUES ($1, $2)
        ON CONFLICT (user_id, token) DO NOTHING
        ",
    )
    .bind(user_id)
    .bind(token)
    .execute(e)
    .await
    .map(|_| ())
    .map_err(|err| {
        tracing::error!(
            "Error occurred while trying to create a push token: {}",
            err
        );
        Error::UnexpectedError
    })
}

pub async fn find_many_by_user_id<'e, E: PgExecutor<'e>>(
    e: E,
    user_id: &str,
) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        "SELECT token FROM push_tokens WHERE user_id = $1 ORDER BY created_at",
    )
    .bind(user_id)
    .fetch_all(e)
    .await
    .map_err(|err| {
        tracing::error!(
            "Error occurred while trying to fetch push tokens of user {}: {}",
            user_id,
            err
        );
        Error::UnexpectedError
    })
}

pub async fn delete_many_by_user_id<'e, E: PgExecutor<'e>>(
    e: E,
    user_id: &str,
    tokens: &[String],
) -> Result<()> {
    sqlx::query("DELETE FROM push_tokens WHERE user_id = $1 AND token = ANY($2)")
        .bind(user_id)
        .bind(tokens)
        .execute(e)
        .await
        .map(|_| ())
        .map_err(|err| {
            tracing::error!(
                "Error occurred while trying to delete push tokens of user {}: {}",
                user_id,
                err
            );
            Error::UnexpectedError
        })
}

pub struct PgPushTokenStore {
    pool: PgPool,
}

impl PgPushTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PushTokenStore for PgPushTokenStore {
    async fn register(&self, user_id: &str, token: &str) -> Result<()> {
        create(&self.pool, user_id, token).await
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<String>> {
        find_many_by_user_id(&self.pool, user_id).await
    }

    async fn delete_many(&self, user_id: &str, tokens: &[String]) -> Result<()> {
        if tokens.is_empty() {
            return Ok(());
        }
        delete_many_by_user_id(&self.pool, user_id, tokens).await
    }
}
