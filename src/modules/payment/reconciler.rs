use crate::{
    modules::{
        order::repository::{self as order, OrderLedger, OrderStatus, PaymentAudit},
        otp::codec,
    },
    utils::{
        clock::Clock,
        response::{ApiError, ErrorKind},
    },
};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_string_from_number;
use sha2::{Digest, Sha512};
use std::sync::Arc;

/// Midtrans HTTP notification. Numeric fields are accepted as numbers or
/// strings; the signature is computed over their string form.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Notification {
    #[serde(default, deserialize_with = "deserialize_string_from_number")]
    pub order_id: String,
    #[serde(default, deserialize_with = "deserialize_string_from_number")]
    pub status_code: String,
    #[serde(default, deserialize_with = "deserialize_string_from_number")]
    pub gross_amount: String,
    #[serde(default)]
    pub signature_key: String,
    #[serde(default)]
    pub transaction_status: String,
    #[serde(default)]
    pub payment_type: Option<String>,
    #[serde(default)]
    pub fraud_status: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum Error {
    MissingOrderId,
    InvalidSignature,
    Ledger(order::Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::MissingOrderId => ApiError::validation("Missing order_id"),
            Error::InvalidSignature => ApiError::new(ErrorKind::Unauthorized, "Invalid signature"),
            Error::Ledger(_) => ApiError::internal("Server error"),
        }
    }
}

pub fn signature(order_id: &str, status_code: &str, gross_amount: &str, server_key: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    base16ct::lower::encode_string(&hasher.finalize())
}

pub fn verify_authenticity(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    signature_key: &str,
    server_key: &str,
) -> Result<(), Error> {
    let expected = signature(order_id, status_code, gross_amount, server_key);
    if codec::digests_match(&expected, signature_key) {
        Ok(())
    } else {
        Err(Error::InvalidSignature)
    }
}

pub fn map_status(transaction_status: &str) -> OrderStatus {
    match transaction_status {
        "settlement" | "capture" => OrderStatus::Paid,
        "pending" => OrderStatus::PendingPayment,
        "deny" | "cancel" | "expire" => OrderStatus::Cancelled,
        "refund" | "chargeback" => OrderStatus::Refunded,
        _ => OrderStatus::PendingPayment,
    }
}

pub struct PaymentReconciler {
    ledger: Arc<dyn OrderLedger>,
    clock: Arc<dyn Clock>,
}

impl PaymentReconciler {
    pub fn new(ledger: Arc<dyn OrderLedger>, clock: Arc<dyn Clock>) -> Self {
        Self { ledger, clock }
    }

    /// Authenticates the notification and moves the order to the mapped
    /// status. Nothing is written unless the signature checks out.
    pub async fn reconcile(
        &self,
        notification: &Notification,
        raw_notification: serde_json::Value,
        server_key: &str,
    ) -> Result<OrderStatus, Error> {
        if notification.order_id.is_empty() {
            return Err(Error::MissingOrderId);
        }

        verify_authenticity(
            &notification.order_id,
            &notification.status_code,
            &notification.gross_amount,
            &notification.signature_key,
            server_key,
        )
        .map_err(|err| {
            tracing::warn!(
                "Rejected notification with a bad signature for order {}",
                notification.order_id
            );
            err
        })?;

        let status = map_status(&notification.transaction_status);
        let audit = PaymentAudit {
            transaction_status: notification.transaction_status.clone(),
            payment_type: notification.payment_type.clone(),
            fraud_status: notification.fraud_status.clone(),
            raw_notification,
            updated_at: self.clock.now(),
        };

        match self
            .ledger
            .apply_transition(&notification.order_id, status, &audit)
            .await
            .map_err(Error::Ledger)?
        {
            Some(adjustment) => tracing::info!(
                "Order {} moved to {} (deducted: {}, reserved released: {})",
                notification.order_id,
                status.as_str(),
                adjustment.flags.deducted,
                adjustment.flags.reserved_released
            ),
            None => tracing::warn!(
                "Recorded {} for unknown order {}",
                status.as_str(),
                notification.order_id
            ),
        }

        Ok(status)
    }
}
