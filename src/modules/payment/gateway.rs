use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

const SANDBOX_SNAP_ENDPOINT: &str = "https://app.sandbox.midtrans.com/snap/v1/transactions";
const PRODUCTION_SNAP_ENDPOINT: &str = "https://app.midtrans.com/snap/v1/transactions";

pub const ENABLED_PAYMENTS: [&str; 4] = ["bank_transfer", "gopay", "shopeepay", "other_qris"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    NotConfigured,
    RequestNotSent,
    Rejected(String),
    FailedToDecodeResponse,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotConfigured => write!(f, "Midtrans env missing"),
            Error::RequestNotSent => write!(f, "Failed to reach Midtrans"),
            Error::Rejected(reason) => write!(f, "{}", reason),
            Error::FailedToDecodeResponse => write!(f, "Unreadable Midtrans response"),
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TransactionDetails {
    pub order_id: String,
    pub gross_amount: i64,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ItemDetails {
    pub id: String,
    pub price: i64,
    pub quantity: i64,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ShippingAddress {
    pub first_name: String,
    pub phone: String,
    pub address: String,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CustomerDetails {
    pub first_name: String,
    pub phone: String,
    pub shipping_address: ShippingAddress,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SnapRequest {
    pub transaction_details: TransactionDetails,
    pub item_details: Vec<ItemDetails>,
    pub customer_details: CustomerDetails,
    pub enabled_payments: Vec<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_transaction_token(&self, request: &SnapRequest) -> Result<String, Error>;
}

#[derive(Clone)]
pub struct MidtransConfig {
    pub server_key: Option<String>,
    pub client_key: Option<String>,
    pub is_production: bool,
}

/// Midtrans Snap API. Authenticates with the server key as the basic auth
/// user and an empty password.
pub struct MidtransSnap {
    client: reqwest::Client,
    config: MidtransConfig,
}

impl MidtransSnap {
    pub fn new(config: MidtransConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> &'static str {
        if self.config.is_production {
            PRODUCTION_SNAP_ENDPOINT
        } else {
            SANDBOX_SNAP_ENDPOINT
        }
    }
}

#[derive(Deserialize)]
struct SnapTokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct SnapErrorResponse {
    error_messages: Option<Vec<String>>,
}

#[async_trait]
impl PaymentGateway for MidtransSnap {
    async fn create_transaction_token(&self, request: &SnapRequest) -> Result<String, Error> {
        let (Some(server_key), Some(_)) = (&self.config.server_key, &self.config.client_key)
        else {
            return Err(Error::NotConfigured);
        };

        let res = self
            .client
            .post(self.endpoint())
            .basic_auth(server_key, Some(""))
            .json(request)
            .send()
            .await
            .map_err(|err| {
                tracing::error!("Failed to send snap transaction request: {}", err);
                Error::RequestNotSent
            })?;

        let status = res.status();
        if status != StatusCode::CREATED && status != StatusCode::OK {
            let reason = res
                .json::<SnapErrorResponse>()
                .await
                .ok()
                .and_then(|data| data.error_messages)
                .map(|messages| messages.join(", "))
                .unwrap_or_else(|| format!("Midtrans responded with {}", status));

            tracing::error!(
                "Failed to create snap token for order {}: {}",
                request.transaction_details.order_id,
                reason
            );
            return Err(Error::Rejected(reason));
        }

        res.json::<SnapTokenResponse>()
            .await
            .map(|data| data.token)
            .map_err(|err| {
                tracing::error!("Failed to decode snap token response: {}", err);
                Error::FailedToDecodeResponse
            })
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Hands out `snap-<order id>` tokens and remembers every request.
    #[derive(Default)]
    pub struct FakeGateway {
        requests: Mutex<Vec<SnapRequest>>,
        failure: Mutex<Option<Error>>,
    }

    impl FakeGateway {
        pub fn requests(&self) -> Vec<SnapRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn fail_with(&self, err: Error) {
            *self.failure.lock().unwrap() = Some(err);
        }
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn create_transaction_token(&self, request: &SnapRequest) -> Result<String, Error> {
            self.requests.lock().unwrap().push(request.clone());
            match self.failure.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok(format!("snap-{}", request.transaction_details.order_id)),
            }
        }
    }
}
