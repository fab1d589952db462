use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor, PgPool};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Purpose {
    PasswordReset,
    ChangeEmail,
    ChangePhone,
    VerifyEmail,
    VerifyPhone,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::PasswordReset => "password_reset",
            Purpose::ChangeEmail => "change_email",
            Purpose::ChangePhone => "change_phone",
            Purpose::VerifyEmail => "verify_email",
            Purpose::VerifyPhone => "verify_phone",
        }
    }
}

impl FromStr for Purpose {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "password_reset" => Ok(Purpose::PasswordReset),
            "change_email" => Ok(Purpose::ChangeEmail),
            "change_phone" => Ok(Purpose::ChangePhone),
            "verify_email" => Ok(Purpose::VerifyEmail),
            "verify_phone" => Ok(Purpose::VerifyPhone),
            _ => Err(format!("'{}' is not a valid Purpose", s)),
        }
    }
}

/// Where a code is delivered. Messaging goes out over WhatsApp and keeps the
/// `"whatsapp"` wire name clients already send.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Email,
    Messaging,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Messaging => "whatsapp",
        }
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "email" => Ok(Channel::Email),
            "whatsapp" => Ok(Channel::Messaging),
            _ => Err(format!("'{}' is not a valid Channel", s)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OtpKey {
    pub purpose: Purpose,
    pub subject_key: String,
}

impl OtpKey {
    pub fn new(purpose: Purpose, subject_key: String) -> Self {
        Self {
            purpose,
            subject_key,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OtpRecord {
    pub key: OtpKey,
    /// Raw email or uid the record was issued for.
    pub subject: String,
    pub otp_hash: String,
    pub channel: Channel,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub next_allowed_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    UnexpectedError,
    CorruptRecord,
}

pub type Result<T> = std::result::Result<T, Error>;

#[async_trait]
pub trait OtpRecordStore: Send + Sync {
    async fn get(&self, key: &OtpKey) -> Result<Option<OtpRecord>>;

    /// Replaces whatever is stored under the record's key.
    async fn put(&self, record: &OtpRecord) -> Result<()>;

    /// Atomically bumps the attempt counter and returns the new value, or
    /// `None` when the record no longer exists.
    async fn increment_attempts(&self, key: &OtpKey) -> Result<Option<i32>>;

    async fn delete(&self, key: &OtpKey) -> Result<()>;

    /// Deletes the record only if it still holds `otp_hash`. Returns whether
    /// this call removed it, so at most one caller can spend a code.
    async fn consume(&self, key: &OtpKey, otp_hash: &str) -> Result<bool>;
}

#[derive(FromRow)]
struct OtpRow {
    purpose: String,
    subject_key: String,
    subject: String,
    otp_hash: String,
    channel: String,
    attempts: i32,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    next_allowed_at: DateTime<Utc>,
}

impl TryFrom<OtpRow> for OtpRecord {
    type Error = Error;

    fn try_from(row: OtpRow) -> Result<Self> {
        let corrupt = |err: String| {
            tracing::error!("Found unreadable otp record {}: {}", row.subject_key, err);
            Error::CorruptRecord
        };

        Ok(OtpRecord {
            key: OtpKey::new(row.purpose.parse().map_err(corrupt)?, row.subject_key.clone()),
            channel: row.channel.parse().map_err(corrupt)?,
            subject: row.subject,
            otp_hash: row.otp_hash,
            attempts: row.attempts,
            created_at: row.created_at,
            expires_at: row.expires_at,
            next_allowed_at: row.next_allowed_at,
        })
    }
}

pub async fn find_by_key<'e, E: PgExecutor<'e>>(e: E, key: &OtpKey) -> Result<Option<OtpRecord>> {
    sqlx::query_as::<_, OtpRow>(
        "SELECT * FROM otp_records WHERE purpose = $1 AND subject_key = $2",
    )
    .bind(key.purpose.as_str())
    .bind(&key.subject_key)
    .fetch_optional(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while trying to fetch otp record: {}", err);
        Error::UnexpectedError
    })?
    .map(OtpRecord::try_from)
    .transpose()
}

pub async fn upsert<'e, E: PgExecutor<'e>>(e: E, record: &OtpRecord) -> Result<()> {
    sqlx::query(
        "
        INSERT INTO otp_records (
            purpose,
            subject_key,
            subject,
            otp_hash,
            channel,
            attempts,
            created_at,
            expires_at,
            next_allowed_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (purpose, subject_key) DO UPDATE SET
            subject = EXCLUDED.subject,
            otp_hash = EXCLUDED.otp_hash,
            channel = EXCLUDED.channel,
            attempts = EXCLUDED.attempts,
            created_at = EXCLUDED.created_at,
            expires_at = EXCLUDED.expires_at,
            next_allowed_at = EXCLUDED.next_allowed_at
        ",
    )
    .bind(record.key.purpose.as_str())
    .bind(&record.key.subject_key)
    .bind(&record.subject)
    .bind(&record.otp_hash)
    .bind(record.channel.as_str())
    .bind(record.attempts)
    .bind(record.created_at)
    .bind(record.expires_at)
    .bind(record.next_allowed_at)
    .execute(e)
    .await
    .map(|_| ())
    .map_err(|err| {
        tracing::error!("Error occurred while trying to store otp record: {}", err);
        Error::UnexpectedError
    })
}

pub async fn increment_attempts_by_key<'e, E: PgExecutor<'e>>(
    e: E,
    key: &OtpKey,
) -> Result<Option<i32>> {
    sqlx::query_scalar::<_, i32>(
        "
        UPDATE otp_records SET
            attempts = attempts + 1
        WHERE
            purpose = $1 AND subject_key = $2
        RETURNING attempts
        ",
    )
    .bind(key.purpose.as_str())
    .bind(&key.subject_key)
    .fetch_optional(e)
    .await
    .map_err(|err| {
        tracing::error!(
            "Error occurred while trying to increment otp attempts: {}",
            err
        );
        Error::UnexpectedError
    })
}

pub async fn delete_by_key<'e, E: PgExecutor<'e>>(e: E, key: &OtpKey) -> Result<()> {
    sqlx::query("DELETE FROM otp_records WHERE purpose = $1 AND subject_key = $2")
        .bind(key.purpose.as_str())
        .bind(&key.subject_key)
        .execute(e)
        .await
        .map(|_| ())
        .map_err(|err| {
            tracing::error!("Error occurred while trying to delete otp record: {}", err);
            Error::UnexpectedError
        })
}

pub async fn consume_by_key<'e, E: PgExecutor<'e>>(
    e: E,
    key: &OtpKey,
    otp_hash: &str,
) -> Result<bool> {
    sqlx::query(
        "DELETE FROM otp_records WHERE purpose = $1 AND subject_key = $2 AND otp_hash = $3",
    )
    .bind(key.purpose.as_str())
    .bind(&key.subject_key)
    .bind(otp_hash)
    .execute(e)
    .await
    .map(|res| res.rows_affected() == 1)
    .map_err(|err| {
        tracing::error!("Error occurred while trying to consume otp record: {}", err);
        Error::UnexpectedError
    })
}

pub struct PgOtpRecordStore {
    pool: PgPool,
}

impl PgOtpRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OtpRecordStore for PgOtpRecordStore {
    async fn get(&self, key: &OtpKey) -> Result<Option<OtpRecord>> {
        find_by_key(&self.pool, key).await
    }

    async fn put(&self, record: &OtpRecord) -> Result<()> {
        upsert(&self.pool, record).await
    }

    async fn increment_attempts(&self, key: &OtpKey) -> Result<Option<i32>> {
        increment_attempts_by_key(&self.pool, key).await
    }

    async fn delete(&self, key: &OtpKey) -> Result<()> {
        delete_by_key(&self.pool, key).await
    }

    async fn consume(&self, key: &OtpKey, otp_hash: &str) -> Result<bool> {
        consume_by_key(&self.pool, key, otp_hash).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purposes_round_trip_through_their_storage_names() {
        for purpose in [
            Purpose::PasswordReset,
            Purpose::ChangeEmail,
            Purpose::ChangePhone,
            Purpose::VerifyEmail,
            Purpose::VerifyPhone,
        ] {
            assert_eq!(purpose.as_str().parse::<Purpose>(), Ok(purpose));
        }
        assert!("reset".parse::<Purpose>().is_err());
    }

    #[test]
    fn messaging_channel_keeps_whatsapp_wire_name() {
        assert_eq!("whatsapp".parse::<Channel>(), Ok(Channel::Messaging));
        assert_eq!(Channel::Messaging.as_str(), "whatsapp");
        assert!("sms".parse::<Channel>().is_err());
    }
}

#[cfg(test)]
mod pg_tests {
    use super::*;
    use crate::utils::database::testing;
    use chrono::{Duration, TimeZone};
    use futures::future::join_all;

    fn record(subject_key: &str) -> OtpRecord {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        OtpRecord {
            key: OtpKey::new(Purpose::PasswordReset, subject_key.to_string()),
            subject: format!("{}@example.com", subject_key),
            otp_hash: "hash-1".to_string(),
            channel: Channel::Email,
            attempts: 0,
            created_at: now,
            expires_at: now + Duration::minutes(5),
            next_allowed_at: now + Duration::seconds(60),
        }
    }

    #[tokio::test]
    async fn concurrent_attempts_are_all_counted() {
        let Some(pool) = testing::pool().await else {
            return;
        };
        let store = PgOtpRecordStore::new(pool);
        let record = record(&ulid::Ulid::new().to_string());
        store.put(&record).await.unwrap();

        let counts = join_all((0..10).map(|_| store.increment_attempts(&record.key))).await;

        let mut counts = counts
            .into_iter()
            .map(|count| count.unwrap().unwrap())
            .collect::<Vec<_>>();
        counts.sort();
        assert_eq!(counts, (1..=10).collect::<Vec<_>>());
        assert_eq!(store.get(&record.key).await.unwrap().unwrap().attempts, 10);

        store.delete(&record.key).await.unwrap();
    }

    #[tokio::test]
    async fn a_code_is_consumed_by_one_caller_only() {
        let Some(pool) = testing::pool().await else {
            return;
        };
        let store = PgOtpRecordStore::new(pool);
        let record = record(&ulid::Ulid::new().to_string());
        store.put(&record).await.unwrap();

        let (first, second) = tokio::join!(
            store.consume(&record.key, &record.otp_hash),
            store.consume(&record.key, &record.otp_hash),
        );

        let mut outcomes = vec![first.unwrap(), second.unwrap()];
        outcomes.sort();
        assert_eq!(outcomes, vec![false, true]);
        assert_eq!(store.get(&record.key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn attempts_on_a_missing_record_report_none() {
        let Some(pool) = testing::pool().await else {
            return;
        };
        let store = PgOtpRecordStore::new(pool);
        let key = OtpKey::new(Purpose::ChangeEmail, ulid::Ulid::new().to_string());

        assert_eq!(store.increment_attempts(&key).await, Ok(None));
        assert_eq!(store.consume(&key, "hash-1").await, Ok(false));
    }
}
