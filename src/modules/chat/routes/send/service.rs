use super::types::{request, response};
use crate::{
    modules::{
        chat::repository::NewMessage,
        notification::service::push::{PushNotification, PushOutcome},
    },
    types::Context,
    utils::response::ApiError,
};
use std::collections::HashMap;
use std::sync::Arc;

const PREVIEW_LENGTH: usize = 80;

pub(super) fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_LENGTH {
        format!("{}...", text.chars().take(PREVIEW_LENGTH).collect::<String>())
    } else {
        text.to_string()
    }
}

fn trimmed(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or_default()
}

struct Push<'a> {
    chat_id: &'a str,
    sender_uid: &'a str,
    receiver_uid: &'a str,
    sender_name: &'a str,
    text: &'a str,
}

/// Best effort. Failures are logged and never reach the caller.
async fn notify_receiver(ctx: &Context, push: Push<'_>) {
    let tokens = match ctx.push_tokens.find_by_user_id(push.receiver_uid).await {
        Ok(tokens) => tokens,
        Err(_) => {
            tracing::warn!("Skipping chat push to {}: token lookup failed", push.receiver_uid);
            return;
        }
    };
    if tokens.is_empty() {
        return;
    }

    let title = if push.sender_name.is_empty() {
        "Pesan baru".to_string()
    } else {
        push.sender_name.to_string()
    };
    let body = preview(push.text);

    let data = HashMap::from([
        ("type".to_string(), "chat".to_string()),
        ("chatId".to_string(), push.chat_id.to_string()),
        ("senderUid".to_string(), push.sender_uid.to_string()),
        ("receiverUid".to_string(), push.receiver_uid.to_string()),
        ("title".to_string(), title.clone()),
        ("body".to_string(), body.clone()),
    ]);

    let notification = PushNotification {
        title,
        body,
        channel_id: Some("chat".to_string()),
        tag: Some(push.chat_id.to_string()),
    };
    let outcomes = ctx.push.send_multicast(&tokens, notification, data).await;

    let mut stale = Vec::new();
    for (token, outcome) in tokens.iter().zip(outcomes) {
        match outcome {
            PushOutcome::Delivered => {}
            PushOutcome::Unregistered => stale.push(token.clone()),
            PushOutcome::Failed(reason) => tracing::warn!(
                "Chat push to a device of user {} failed: {}",
                push.receiver_uid,
                reason
            ),
        }
    }

    if stale.is_empty() {
        return;
    }

    tracing::info!(
        "Removing {} unregistered push tokens of user {}",
        stale.len(),
        push.receiver_uid
    );
    if let Err(err) = ctx.push_tokens.delete_many(push.receiver_uid, &stale).await {
        tracing::warn!(
            "Failed to remove unregistered push tokens of user {}: {:?}",
            push.receiver_uid,
            err
        );
    }
}

pub async fn service(ctx: Arc<Context>, payload: request::Payload) -> response::Response {
    let sender_uid = payload.auth.uid;
    let chat_id = payload.body.chat_id.trim();
    let receiver_uid = payload.body.receiver_uid.trim();
    let text = payload.body.text.trim();

    if chat_id.is_empty() || receiver_uid.is_empty() || text.is_empty() {
        return Err(ApiError::validation("chatId, receiverUid, text are required"));
    }
    if receiver_uid == sender_uid {
        return Err(ApiError::validation("receiverUid cannot be same as sender"));
    }

    let message_id = ctx
        .chats
        .append_message(NewMessage {
            chat_id,
            sender_id: &sender_uid,
            receiver_id: receiver_uid,
            text,
            title: trimmed(&payload.body.chat_title_for_sender),
            at: ctx.clock.now(),
        })
        .await
        .map_err(|_| ApiError::internal("Server error"))?;

    notify_receiver(
        &ctx,
        Push {
            chat_id,
            sender_uid: &sender_uid,
            receiver_uid,
            sender_name: trimmed(&payload.body.sender_name),
            text,
        },
    )
    .await;

    Ok(response::Success::MessageSent(message_id))
}
