use super::types::{request, response};
use crate::{
    modules::{
        company::{self, repository::ChangeAction},
        otp::{repository::Channel, service::IssueRequest},
    },
    types::Context,
    utils::response::{ApiError, ErrorKind},
};
use std::sync::Arc;

pub async fn service(ctx: Arc<Context>, payload: request::Payload) -> response::Response {
    let uid = payload.auth.uid;
    let action = payload
        .body
        .action
        .trim()
        .parse::<ChangeAction>()
        .map_err(|_| ApiError::validation("action tidak valid"))?;
    let channel = payload
        .body
        .channel
        .trim()
        .parse::<Channel>()
        .map_err(|_| ApiError::validation("channel tidak valid"))?;

    let contacts = ctx
        .companies
        .find_contacts(&uid)
        .await
        .map_err(|_| ApiError::internal("Server error"))?
        .ok_or_else(|| ApiError::new(ErrorKind::NotFound, "Company tidak ditemukan"))?;

    // The code always goes to the contact currently on file.
    let destination = match channel {
        Channel::Email => contacts
            .email
            .ok_or_else(|| ApiError::validation("Email lama belum ada."))?,
        Channel::Messaging => contacts
            .phone
            .ok_or_else(|| ApiError::validation("Nomor HP lama belum ada."))?,
    };

    ctx.otp
        .issue(
            IssueRequest {
                key: company::change_key(&uid, action),
                subject: &uid,
                channel,
                destination: &destination,
            },
            ctx.notifier.as_ref(),
        )
        .await?;

    tracing::info!("Issued {} code for company {}", action.as_str(), uid);

    Ok(response::Success::OtpSent)
}
