use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor, PgPool};

#[derive(Clone, Debug, PartialEq, FromRow)]
pub struct Account {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Contact {
    Email,
    Phone,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    UnexpectedError,
}

pub type Result<T> = std::result::Result<T, Error>;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>>;

    async fn set_password(&self, id: &str, password: &str) -> Result<()>;

    /// Ends every session of the account so all devices must sign in again.
    async fn revoke_sessions(&self, id: &str) -> Result<()>;

    /// Resolves a bearer token to the uid owning a live session.
    async fn find_session_owner(&self, access_token: &str, now: DateTime<Utc>)
        -> Result<Option<String>>;

    async fn mark_contact_verified(&self, id: &str, contact: Contact, at: DateTime<Utc>)
        -> Result<()>;
}

pub async fn find_by_email<'e, E: PgExecutor<'e>>(e: E, email: &str) -> Result<Option<Account>> {
    sqlx::query_as::<_, Account>("SELECT id, email, phone FROM users WHERE LOWER(email) = $1")
        .bind(email)
        .fetch_optional(e)
        .await
        .map_err(|err| {
            tracing::error!("Error occurred while trying to fetch user by email: {}", err);
            Error::UnexpectedError
        })
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(e: E, id: &str) -> Result<Option<Account>> {
    sqlx::query_as::<_, Account>("SELECT id, email, phone FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(e)
        .await
        .map_err(|err| {
            tracing::error!("Error occurred while trying to fetch user {}: {}", id, err);
            Error::UnexpectedError
        })
}

pub async fn update_password_hash<'e, E: PgExecutor<'e>>(
    e: E,
    id: &str,
    password_hash: &str,
) -> Result<()> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(e)
        .await
        .map(|_| ())
        .map_err(|err| {
            tracing::error!(
                "Error occurred while trying to update password of user {}: {}",
                id,
                err
            );
            Error::UnexpectedError
        })
}

pub async fn delete_sessions_by_user_id<'e, E: PgExecutor<'e>>(e: E, user_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(e)
        .await
        .map(|_| ())
        .map_err(|err| {
            tracing::error!(
                "Error occurred while trying to revoke sessions of user {}: {}",
                user_id,
                err
            );
            Error::UnexpectedError
        })
}

pub async fn find_session_owner<'e, E: PgExecutor<'e>>(
    e: E,
    access_token: &str,
    now: DateTime<Utc>,
) -> Result<Option<String>> {
    sqlx::query_scalar::<_, String>(
        "SELECT user_id FROM sessions WHERE access_token = $1 AND expires_at > $2",
    )
    .bind(access_token)
    .bind(now)
    .fetch_optional(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while trying to verify access token: {}", err);
        Error::UnexpectedError
    })
}

pub async fn mark_contact_verified<'e, E: PgExecutor<'e>>(
    e: E,
    id: &str,
    contact: Contact,
    at: DateTime<Utc>,
) -> Result<()> {
    let query = match contact {
        Contact::Email => "UPDATE users SET email_verified_at = $2, updated_at = $2 WHERE id = $1",
        Contact::Phone => "UPDATE users SET phone_verified_at = $2, updated_at = $2 WHERE id = $1",
    };

    sqlx::query(query)
        .bind(id)
        .bind(at)
        .execute(e)
        .await
        .map(|_| ())
        .map_err(|err| {
            tracing::error!(
                "Error occurred while trying to mark contact of user {} as verified: {}",
                id,
                err
            );
            Error::UnexpectedError
        })
}

pub struct PgIdentityProvider {
    pool: PgPool,
}

impl PgIdentityProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityProvider for PgIdentityProvider {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        find_by_email(&self.pool, email).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>> {
        find_by_id(&self.pool, id).await
    }

    async fn set_password(&self, id: &str, password: &str) -> Result<()> {
        let password = password.to_string();
        let password_hash =
            tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
                .await
                .map_err(|err| {
                    tracing::error!("Password hashing task failed: {}", err);
                    Error::UnexpectedError
                })?
                .map_err(|err| {
                    tracing::error!("Failed to hash password: {}", err);
                    Error::UnexpectedError
                })?;

        update_password_hash(&self.pool, id, &password_hash).await
    }

    async fn revoke_sessions(&self, id: &str) -> Result<()> {
        delete_sessions_by_user_id(&self.pool, id).await
    }

    async fn find_session_owner(
        &self,
        access_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        find_session_owner(&self.pool, access_token, now).await
    }

    async fn mark_contact_verified(
        &self,
        id: &str,
        contact: Contact,
        at: DateTime<Utc>,
    ) -> Result<()> {
        mark_contact_verified(&self.pool, id, contact, at).await
    }
}
