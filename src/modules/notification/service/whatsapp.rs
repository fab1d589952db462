use super::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, to: &str, body: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct WhatsAppConfig {
    pub token: Option<String>,
    pub phone_number_id: Option<String>,
    pub api_version: String,
}

/// WhatsApp Cloud API text messages.
pub struct WhatsAppMessenger {
    client: Client,
    config: WhatsAppConfig,
}

impl WhatsAppMessenger {
    pub fn new(config: WhatsAppConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[derive(Deserialize)]
struct GraphError {
    message: Option<String>,
}

#[derive(Deserialize)]
struct GraphErrorResponse {
    error: Option<GraphError>,
}

#[async_trait]
impl Messenger for WhatsAppMessenger {
    async fn send_text(&self, to: &str, body: &str) -> Result<()> {
        let token = self
            .config
            .token
            .as_deref()
            .ok_or(Error::NotConfigured("WHATSAPP_TOKEN"))?;
        let phone_number_id = self
            .config
            .phone_number_id
            .as_deref()
            .ok_or(Error::NotConfigured("WHATSAPP_PHONE_NUMBER_ID"))?;

        let url = format!(
            "https://graph.facebook.com/{}/{}/messages",
            self.config.api_version, phone_number_id
        );

        let res = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&json!({
                "messaging_product": "whatsapp",
                "to": to,
                "type": "text",
                "text": { "body": body },
            }))
            .send()
            .await
            .map_err(|err| {
                tracing::error!("Failed to send WhatsApp request: {}", err);
                Error::NotSent("Failed to send WhatsApp message".to_string())
            })?;

        if res.status().is_success() {
            return Ok(());
        }

        let status = res.status();
        let reason = res
            .json::<GraphErrorResponse>()
            .await
            .ok()
            .and_then(|data| data.error)
            .and_then(|error| error.message)
            .unwrap_or_else(|| "Failed to send WhatsApp message".to_string());

        tracing::error!("WhatsApp API responded with {}: {}", status, reason);
        Err(Error::NotSent(reason))
    }
}
