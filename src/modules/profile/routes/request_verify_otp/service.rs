use super::types::{request, response};
use crate::{
    modules::{
        otp::{repository::Channel, service::IssueRequest},
        profile,
    },
    types::Context,
    utils::response::{ApiError, ErrorKind},
};
use std::sync::Arc;

pub async fn service(ctx: Arc<Context>, payload: request::Payload) -> response::Response {
    let uid = payload.auth.uid;
    let contact = profile::parse_contact(&payload.body.purpose)
        .ok_or_else(|| ApiError::validation("purpose tidak valid"))?;
    let channel = payload
        .body
        .channel
        .trim()
        .parse::<Channel>()
        .map_err(|_| ApiError::validation("channel tidak valid"))?;

    let account = ctx
        .identity
        .find_by_id(&uid)
        .await
        .map_err(|_| ApiError::internal("Server error"))?
        .ok_or_else(|| ApiError::new(ErrorKind::NotFound, "User tidak ditemukan."))?;

    let destination = match channel {
        Channel::Email => account
            .email
            .ok_or_else(|| ApiError::validation("User tidak punya email login."))?,
        Channel::Messaging => account
            .phone
            .ok_or_else(|| ApiError::validation("Nomor HP belum diisi."))?,
    };

    ctx.otp
        .issue(
            IssueRequest {
                key: profile::verification_key(&uid, contact),
                subject: &uid,
                channel,
                destination: &destination,
            },
            ctx.notifier.as_ref(),
        )
        .await?;

    Ok(response::Success::OtpSent)
}
