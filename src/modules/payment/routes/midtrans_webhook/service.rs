use super::types::{request, response};
use crate::{
    types::Context,
    utils::response::{ApiError, ErrorKind},
};
use std::sync::Arc;

pub async fn service(ctx: Arc<Context>, payload: request::Payload) -> response::Response {
    if let Some(expected) = ctx.payment.webhook_secret.as_deref() {
        if payload.secret.as_deref() != Some(expected) {
            tracing::warn!("Rejected notification with a bad webhook secret");
            return Err(ApiError::new(
                ErrorKind::Unauthorized,
                "Invalid webhook secret",
            ));
        }
    }

    if payload.notification.order_id.is_empty() {
        return Err(ApiError::validation("Missing order_id"));
    }

    let Some(server_key) = ctx.payment.server_key.as_deref() else {
        tracing::error!("MIDTRANS_SERVER_KEY is not set, cannot verify notification");
        return Err(ApiError::internal("Midtrans env missing"));
    };

    let status = ctx
        .reconciler
        .reconcile(&payload.notification, payload.raw, server_key)
        .await?;

    Ok(response::Success::Reconciled(status))
}
