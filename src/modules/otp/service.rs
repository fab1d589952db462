use super::codec;
use super::repository::{self, Channel, OtpKey, OtpRecord, OtpRecordStore};
use crate::{
    modules::notification::service::{self as notification, OtpDelivery, OtpMessage},
    utils::{
        clock::Clock,
        response::{ApiError, ErrorKind},
    },
};
use chrono::Duration;
use std::sync::Arc;

/// How long an issued code stays valid.
pub const OTP_TTL_SECONDS: i64 = 10 * 60;
/// Minimum wait between two issuances for the same subject and purpose.
pub const RESEND_COOLDOWN_SECONDS: i64 = 60;
/// Failed verifications a record survives.
pub const MAX_ATTEMPTS: i32 = 5;
pub const DELIVERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

#[derive(Debug)]
pub enum IssueError {
    RateLimited,
    Store(repository::Error),
    /// The record was written but the code never left. It is kept and the
    /// cooldown applies as if delivery had worked.
    Delivery(notification::Error),
}

#[derive(Debug, PartialEq)]
pub enum VerifyError {
    NotFoundOrExpired,
    Expired,
    TooManyAttempts,
    InvalidCode,
    Store(repository::Error),
}

pub struct IssueRequest<'a> {
    pub key: OtpKey,
    pub subject: &'a str,
    pub channel: Channel,
    pub destination: &'a str,
}

/// Issue/verify state machine shared by every OTP flow.
///
/// A record moves `NONE -> ISSUED` on issue and leaves `ISSUED` by being
/// deleted: after a successful verify, when found expired, or when the
/// attempt budget runs out.
pub struct OtpLifecycle {
    store: Arc<dyn OtpRecordStore>,
    clock: Arc<dyn Clock>,
    pepper: String,
    delivery_timeout: std::time::Duration,
}

impl OtpLifecycle {
    pub fn new(store: Arc<dyn OtpRecordStore>, clock: Arc<dyn Clock>, pepper: String) -> Self {
        Self {
            store,
            clock,
            pepper,
            delivery_timeout: DELIVERY_TIMEOUT,
        }
    }

    #[cfg(test)]
    pub fn with_delivery_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    pub async fn issue(
        &self,
        request: IssueRequest<'_>,
        delivery: &dyn OtpDelivery,
    ) -> Result<(), IssueError> {
        let now = self.clock.now();

        if let Some(existing) = self
            .store
            .get(&request.key)
            .await
            .map_err(IssueError::Store)?
        {
            if now < existing.next_allowed_at {
                tracing::debug!(
                    "Rejecting {} otp request for {} until {}",
                    request.key.purpose.as_str(),
                    request.key.subject_key,
                    existing.next_allowed_at
                );
                return Err(IssueError::RateLimited);
            }
        }

        let code = codec::generate();
        let record = OtpRecord {
            key: request.key.clone(),
            subject: request.subject.to_string(),
            otp_hash: codec::hash(&code, &self.pepper),
            channel: request.channel,
            attempts: 0,
            created_at: now,
            expires_at: now + Duration::seconds(OTP_TTL_SECONDS),
            next_allowed_at: now + Duration::seconds(RESEND_COOLDOWN_SECONDS),
        };

        self.store.put(&record).await.map_err(IssueError::Store)?;

        let message = OtpMessage {
            channel: request.channel,
            purpose: request.key.purpose,
            destination: request.destination,
            code: &code,
        };

        match tokio::time::timeout(self.delivery_timeout, delivery.deliver(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                tracing::error!(
                    "Failed to deliver {} otp over {}: {}",
                    request.key.purpose.as_str(),
                    request.channel.as_str(),
                    err
                );
                Err(IssueError::Delivery(err))
            }
            Err(_) => {
                tracing::error!(
                    "Timed out delivering {} otp over {}",
                    request.key.purpose.as_str(),
                    request.channel.as_str()
                );
                Err(IssueError::Delivery(notification::Error::TimedOut))
            }
        }
    }

    /// Checks run in a fixed order: presence, expiry, attempt budget, code.
    pub async fn verify(&self, key: &OtpKey, code: &str) -> Result<(), VerifyError> {
        let record = self
            .store
            .get(key)
            .await
            .map_err(VerifyError::Store)?
            .ok_or(VerifyError::NotFoundOrExpired)?;

        if self.clock.now() > record.expires_at {
            self.store.delete(key).await.map_err(VerifyError::Store)?;
            return Err(VerifyError::Expired);
        }

        if record.attempts >= MAX_ATTEMPTS {
            self.store.delete(key).await.map_err(VerifyError::Store)?;
            return Err(VerifyError::TooManyAttempts);
        }

        if !codec::digests_match(&codec::hash(code, &self.pepper), &record.otp_hash) {
            let attempts = self
                .store
                .increment_attempts(key)
                .await
                .map_err(VerifyError::Store)?;

            if attempts.map_or(false, |attempts| attempts >= MAX_ATTEMPTS) {
                tracing::info!(
                    "Attempt budget exhausted for {} otp {}",
                    key.purpose.as_str(),
                    key.subject_key
                );
                self.store.delete(key).await.map_err(VerifyError::Store)?;
            }

            return Err(VerifyError::InvalidCode);
        }

        // A concurrent verify may have spent the code since it was read.
        if self
            .store
            .consume(key, &record.otp_hash)
            .await
            .map_err(VerifyError::Store)?
        {
            Ok(())
        } else {
            Err(VerifyError::NotFoundOrExpired)
        }
    }
}

impl From<IssueError> for ApiError {
    fn from(err: IssueError) -> Self {
        match err {
            IssueError::RateLimited => ApiError::new(
                ErrorKind::RateLimited,
                "Tunggu sebentar sebelum minta OTP lagi.",
            ),
            IssueError::Store(_) => ApiError::internal("Server error"),
            IssueError::Delivery(_) => ApiError::new(ErrorKind::Upstream, "Gagal mengirim OTP."),
        }
    }
}

impl From<VerifyError> for ApiError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::NotFoundOrExpired => {
                ApiError::validation("OTP tidak ditemukan / sudah kadaluarsa.")
            }
            VerifyError::Expired => ApiError::validation("OTP sudah kadaluarsa."),
            VerifyError::TooManyAttempts => ApiError::new(
                ErrorKind::TooManyAttempts,
                "Terlalu banyak percobaan. Minta OTP baru.",
            ),
            VerifyError::InvalidCode => ApiError::validation("OTP salah."),
            VerifyError::Store(_) => ApiError::internal("Server error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::notification::service::testing::RecordingDelivery;
    use crate::modules::otp::repository::{memory::MemoryOtpRecordStore, Purpose};
    use crate::utils::clock::testing::ManualClock;

    struct Fixture {
        store: Arc<MemoryOtpRecordStore>,
        clock: Arc<ManualClock>,
        delivery: RecordingDelivery,
        lifecycle: OtpLifecycle,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryOtpRecordStore::default());
        let clock = Arc::new(ManualClock::new());
        let lifecycle = OtpLifecycle::new(store.clone(), clock.clone(), "pepper".to_string());
        Fixture {
            store,
            clock,
            delivery: RecordingDelivery::default(),
            lifecycle,
        }
    }

    fn key() -> OtpKey {
        OtpKey::new(
            Purpose::PasswordReset,
            codec::encode_subject_key("a@example.com"),
        )
    }

    fn request(key: &OtpKey) -> IssueRequest<'static> {
        IssueRequest {
            key: key.clone(),
            subject: "a@example.com",
            channel: Channel::Email,
            destination: "a@example.com",
        }
    }

    fn wrong_code(right: &str) -> &'static str {
        if right == "000000" {
            "111111"
        } else {
            "000000"
        }
    }

    #[tokio::test]
    async fn issue_writes_a_fresh_record_and_delivers_the_code() {
        let f = fixture();
        let key = key();

        f.lifecycle.issue(request(&key), &f.delivery).await.unwrap();

        let record = f.store.snapshot(&key).unwrap();
        let now = f.clock.now();
        assert_eq!(record.attempts, 0);
        assert_eq!(record.expires_at, now + Duration::milliseconds(600_000));
        assert_eq!(record.next_allowed_at, now + Duration::seconds(60));
        assert_eq!(record.subject, "a@example.com");

        let code = f.delivery.last_code().unwrap();
        assert_eq!(record.otp_hash, codec::hash(&code, "pepper"));
        assert_ne!(record.otp_hash, codec::hash(&code, ""));
    }

    #[tokio::test]
    async fn reissue_inside_cooldown_is_rate_limited() {
        let f = fixture();
        let key = key();

        f.lifecycle.issue(request(&key), &f.delivery).await.unwrap();
        let first = f.store.snapshot(&key).unwrap();

        f.clock.advance(Duration::seconds(59));
        let result = f.lifecycle.issue(request(&key), &f.delivery).await;

        assert!(matches!(result, Err(IssueError::RateLimited)));
        assert_eq!(f.store.snapshot(&key).unwrap(), first);
        assert_eq!(f.delivery.delivered().len(), 1);
    }

    #[tokio::test]
    async fn reissue_after_cooldown_replaces_the_old_code() {
        let f = fixture();
        let key = key();

        f.lifecycle.issue(request(&key), &f.delivery).await.unwrap();
        let first_code = f.delivery.last_code().unwrap();
        f.lifecycle.verify(&key, wrong_code(&first_code)).await.ok();

        f.clock.advance(Duration::seconds(60));
        f.lifecycle.issue(request(&key), &f.delivery).await.unwrap();
        let second_code = f.delivery.last_code().unwrap();

        let record = f.store.snapshot(&key).unwrap();
        assert_eq!(record.attempts, 0);
        assert_eq!(record.otp_hash, codec::hash(&second_code, "pepper"));

        if first_code != second_code {
            assert_eq!(
                f.lifecycle.verify(&key, &first_code).await,
                Err(VerifyError::InvalidCode)
            );
        }
        assert_eq!(f.lifecycle.verify(&key, &second_code).await, Ok(()));
    }

    #[tokio::test]
    async fn delivery_failure_keeps_the_record() {
        let f = fixture();
        let key = key();
        f.delivery
            .fail_with(notification::Error::NotSent("smtp down".to_string()));

        let result = f.lifecycle.issue(request(&key), &f.delivery).await;

        assert!(matches!(
            result,
            Err(IssueError::Delivery(notification::Error::NotSent(_)))
        ));
        assert!(f.store.snapshot(&key).is_some());
        assert!(matches!(
            f.lifecycle.issue(request(&key), &f.delivery).await,
            Err(IssueError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn slow_delivery_times_out_as_a_delivery_failure() {
        let store = Arc::new(MemoryOtpRecordStore::default());
        let lifecycle = OtpLifecycle::new(
            store.clone(),
            Arc::new(ManualClock::new()),
            "pepper".to_string(),
        )
        .with_delivery_timeout(std::time::Duration::from_millis(20));
        let delivery = RecordingDelivery::default();
        delivery.stall_for(std::time::Duration::from_secs(5));
        let key = key();

        let result = lifecycle.issue(request(&key), &delivery).await;

        assert!(matches!(
            result,
            Err(IssueError::Delivery(notification::Error::TimedOut))
        ));
        assert!(store.snapshot(&key).is_some());
    }

    #[tokio::test]
    async fn correct_code_verifies_exactly_once() {
        let f = fixture();
        let key = key();
        f.lifecycle.issue(request(&key), &f.delivery).await.unwrap();
        let code = f.delivery.last_code().unwrap();

        assert_eq!(f.lifecycle.verify(&key, &code).await, Ok(()));
        assert!(f.store.snapshot(&key).is_none());
        assert_eq!(
            f.lifecycle.verify(&key, &code).await,
            Err(VerifyError::NotFoundOrExpired)
        );
    }

    /// Hands control back to the scheduler after every read so two verifies
    /// interleave between their read and their delete.
    struct YieldingStore(Arc<MemoryOtpRecordStore>);

    #[async_trait::async_trait]
    impl OtpRecordStore for YieldingStore {
        async fn get(&self, key: &OtpKey) -> repository::Result<Option<OtpRecord>> {
            let record = self.0.get(key).await;
            tokio::task::yield_now().await;
            record
        }

        async fn put(&self, record: &OtpRecord) -> repository::Result<()> {
            self.0.put(record).await
        }

        async fn increment_attempts(&self, key: &OtpKey) -> repository::Result<Option<i32>> {
            self.0.increment_attempts(key).await
        }

        async fn delete(&self, key: &OtpKey) -> repository::Result<()> {
            self.0.delete(key).await
        }

        async fn consume(&self, key: &OtpKey, otp_hash: &str) -> repository::Result<bool> {
            self.0.consume(key, otp_hash).await
        }
    }

    #[tokio::test]
    async fn concurrent_verifies_spend_the_code_once() {
        let memory = Arc::new(MemoryOtpRecordStore::default());
        let clock = Arc::new(ManualClock::new());
        let lifecycle = OtpLifecycle::new(
            Arc::new(YieldingStore(memory.clone())),
            clock,
            "pepper".to_string(),
        );
        let delivery = RecordingDelivery::default();
        let key = key();
        lifecycle.issue(request(&key), &delivery).await.unwrap();
        let code = delivery.last_code().unwrap();

        let (first, second) = tokio::join!(lifecycle.verify(&key, &code), lifecycle.verify(&key, &code));

        let mut outcomes = vec![first, second];
        outcomes.sort_by_key(|outcome| outcome.is_err());
        assert_eq!(outcomes, vec![Ok(()), Err(VerifyError::NotFoundOrExpired)]);
        assert!(memory.snapshot(&key).is_none());
    }

    #[tokio::test]
    async fn reissued_record_is_not_spent_by_the_old_code() {
        let f = fixture();
        let key = key();
        f.lifecycle.issue(request(&key), &f.delivery).await.unwrap();
        let stale = f.store.snapshot(&key).unwrap();

        f.clock.advance(Duration::seconds(60));
        f.lifecycle.issue(request(&key), &f.delivery).await.unwrap();

        assert_eq!(f.store.consume(&key, &stale.otp_hash).await, Ok(false));
        assert!(f.store.snapshot(&key).is_some());
    }

    #[tokio::test]
    async fn wrong_code_counts_an_attempt() {
        let f = fixture();
        let key = key();
        f.lifecycle.issue(request(&key), &f.delivery).await.unwrap();
        let code = f.delivery.last_code().unwrap();

        assert_eq!(
            f.lifecycle.verify(&key, wrong_code(&code)).await,
            Err(VerifyError::InvalidCode)
        );
        assert_eq!(f.store.snapshot(&key).unwrap().attempts, 1);
        assert_eq!(f.lifecycle.verify(&key, &code).await, Ok(()));
    }

    #[tokio::test]
    async fn five_wrong_codes_burn_the_record() {
        let f = fixture();
        let key = key();
        f.lifecycle.issue(request(&key), &f.delivery).await.unwrap();
        let code = f.delivery.last_code().unwrap();

        for _ in 0..MAX_ATTEMPTS {
            assert_eq!(
                f.lifecycle.verify(&key, wrong_code(&code)).await,
                Err(VerifyError::InvalidCode)
            );
        }

        assert!(f.store.snapshot(&key).is_none());
        assert_eq!(
            f.lifecycle.verify(&key, &code).await,
            Err(VerifyError::NotFoundOrExpired)
        );
    }

    #[tokio::test]
    async fn exhausted_record_is_rejected_and_deleted() {
        let f = fixture();
        let key = key();
        f.lifecycle.issue(request(&key), &f.delivery).await.unwrap();
        let code = f.delivery.last_code().unwrap();

        let mut record = f.store.snapshot(&key).unwrap();
        record.attempts = MAX_ATTEMPTS;
        f.store.insert(record);

        assert_eq!(
            f.lifecycle.verify(&key, &code).await,
            Err(VerifyError::TooManyAttempts)
        );
        assert!(f.store.snapshot(&key).is_none());
    }

    #[tokio::test]
    async fn expiry_wins_over_exhausted_attempts() {
        let f = fixture();
        let key = key();
        f.lifecycle.issue(request(&key), &f.delivery).await.unwrap();
        let code = f.delivery.last_code().unwrap();

        let mut record = f.store.snapshot(&key).unwrap();
        record.attempts = MAX_ATTEMPTS;
        f.store.insert(record);
        f.clock.advance(Duration::seconds(OTP_TTL_SECONDS + 1));

        assert_eq!(
            f.lifecycle.verify(&key, &code).await,
            Err(VerifyError::Expired)
        );
        assert!(f.store.snapshot(&key).is_none());
    }

    #[tokio::test]
    async fn code_is_still_valid_at_the_expiry_instant() {
        let f = fixture();
        let key = key();
        f.lifecycle.issue(request(&key), &f.delivery).await.unwrap();
        let code = f.delivery.last_code().unwrap();

        f.clock.advance(Duration::seconds(OTP_TTL_SECONDS));

        assert_eq!(f.lifecycle.verify(&key, &code).await, Ok(()));
    }

    #[tokio::test]
    async fn records_are_scoped_by_purpose() {
        let f = fixture();
        let email = OtpKey::new(
            Purpose::VerifyEmail,
            codec::encode_subject_key(&codec::composite_subject("uid-1", "email")),
        );
        let phone = OtpKey::new(
            Purpose::VerifyPhone,
            codec::encode_subject_key(&codec::composite_subject("uid-1", "phone")),
        );

        f.lifecycle.issue(request(&email), &f.delivery).await.unwrap();
        f.lifecycle.issue(request(&phone), &f.delivery).await.unwrap();
        let phone_code = f.delivery.last_code().unwrap();

        assert_eq!(f.lifecycle.verify(&phone, &phone_code).await, Ok(()));
        assert!(f.store.snapshot(&email).is_some());
    }

    #[test]
    fn errors_map_to_api_statuses() {
        use axum::http::StatusCode;

        let cases = [
            (ApiError::from(IssueError::RateLimited), StatusCode::TOO_MANY_REQUESTS),
            (
                ApiError::from(IssueError::Delivery(notification::Error::TimedOut)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::from(VerifyError::NotFoundOrExpired),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::from(VerifyError::Expired), StatusCode::BAD_REQUEST),
            (
                ApiError::from(VerifyError::TooManyAttempts),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (ApiError::from(VerifyError::InvalidCode), StatusCode::BAD_REQUEST),
        ];

        for (err, status) in cases {
            assert_eq!(err.kind.status(), status, "{}", err);
        }
        assert_eq!(ApiError::from(VerifyError::InvalidCode).message, "OTP salah.");
    }
}
