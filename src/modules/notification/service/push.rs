use async_trait::async_trait;
use futures::future::join_all;
use oauth_fcm::TokenManager;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Debug, PartialEq)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
    /// Android notification channel the device files the message under.
    pub channel_id: Option<String>,
    /// Replaces an earlier notification with the same tag on the device.
    pub tag: Option<String>,
}

/// Result of sending to a single device token.
#[derive(Clone, Debug, PartialEq)]
pub enum PushOutcome {
    Delivered,
    /// The token is no longer registered with the push service and should be
    /// forgotten.
    Unregistered,
    Failed(String),
}

#[async_trait]
pub trait PushTransport: Send + Sync {
    /// One outcome per token, in the same order as `tokens`.
    async fn send_multicast(
        &self,
        tokens: &[String],
        notification: PushNotification,
        data: HashMap<String, String>,
    ) -> Vec<PushOutcome>;
}

pub struct FcmPush {
    client: Client,
    token_manager: Arc<Mutex<TokenManager>>,
    project_id: String,
}

impl FcmPush {
    pub fn new(token_manager: Arc<Mutex<TokenManager>>, project_id: String) -> Self {
        Self {
            client: Client::new(),
            token_manager,
            project_id,
        }
    }

    async fn send_one(&self, message: &Value) -> PushOutcome {
        let access_token = {
            let mut token_manager = self.token_manager.lock().await;
            match token_manager.get_token().await {
                Ok(access_token) => access_token,
                Err(err) => {
                    tracing::error!("Failed to obtain FCM access token: {:?}", err);
                    return PushOutcome::Failed(format!("{:?}", err));
                }
            }
        };

        let url = format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.project_id
        );
        let response = match self
            .client
            .post(url)
            .bearer_auth(access_token)
            .json(message)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!("Failed to send push notification: {}", err);
                return PushOutcome::Failed(err.to_string());
            }
        };

        if response.status().is_success() {
            return PushOutcome::Delivered;
        }

        let status = response.status().as_u16();
        let reason = response.text().await.unwrap_or_default();
        tracing::warn!("FCM rejected push notification ({}): {}", status, reason);
        if is_unregistered(&reason) {
            PushOutcome::Unregistered
        } else {
            PushOutcome::Failed(format!("{}: {}", status, reason))
        }
    }
}

fn is_unregistered(reason: &str) -> bool {
    reason.contains("UNREGISTERED")
        || reason.contains("registration-token-not-registered")
        || reason.contains("Requested entity was not found")
}

/// FCM v1 message for one device, with high priority Android delivery.
fn fcm_message(
    token: &str,
    notification: &PushNotification,
    data: &HashMap<String, String>,
) -> Value {
    let mut android_notification = json!({ "sound": "default" });
    if let Some(channel_id) = &notification.channel_id {
        android_notification["channel_id"] = json!(channel_id);
    }
    if let Some(tag) = &notification.tag {
        android_notification["tag"] = json!(tag);
    }

    json!({
        "message": {
            "token": token,
            "notification": {
                "title": notification.title,
                "body": notification.body,
            },
            "data": data,
            "android": {
                "priority": "high",
                "notification": android_notification,
            },
        }
    })
}

#[async_trait]
impl PushTransport for FcmPush {
    async fn send_multicast(
        &self,
        tokens: &[String],
        notification: PushNotification,
        data: HashMap<String, String>,
    ) -> Vec<PushOutcome> {
        let sends = tokens.iter().map(|token| {
            let message = fcm_message(token, &notification, &data);
            async move { self.send_one(&message).await }
        });

        join_all(sends).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_unregistered_tokens() {
        assert!(is_unregistered(
            r#"FcmApiError { status: 404, body: "{\"errorCode\": \"UNREGISTERED\"}" }"#
        ));
        assert!(is_unregistered("messaging/registration-token-not-registered"));
        assert!(!is_unregistered("QUOTA_EXCEEDED"));
    }

    #[test]
    fn messages_carry_android_delivery_options() {
        let notification = PushNotification {
            title: "Budi".to_string(),
            body: "Halo".to_string(),
            channel_id: Some("chat".to_string()),
            tag: Some("chat-1".to_string()),
        };
        let data = HashMap::from([("chatId".to_string(), "chat-1".to_string())]);

        let message = fcm_message("device-1", &notification, &data);

        assert_eq!(message["message"]["token"], json!("device-1"));
        assert_eq!(message["message"]["notification"]["title"], json!("Budi"));
        assert_eq!(message["message"]["data"]["chatId"], json!("chat-1"));
        let android = &message["message"]["android"];
        assert_eq!(android["priority"], json!("high"));
        assert_eq!(android["notification"]["channel_id"], json!("chat"));
        assert_eq!(android["notification"]["sound"], json!("default"));
        assert_eq!(android["notification"]["tag"], json!("chat-1"));
    }

    #[test]
    fn untagged_messages_omit_optional_android_fields() {
        let notification = PushNotification {
            title: "t".to_string(),
            body: "b".to_string(),
            channel_id: None,
            tag: None,
        };

        let message = fcm_message("device-1", &notification, &HashMap::new());

        let android = &message["message"]["android"]["notification"];
        assert_eq!(android["sound"], json!("default"));
        assert!(android.get("tag").is_none());
        assert!(android.get("channel_id").is_none());
    }
}
