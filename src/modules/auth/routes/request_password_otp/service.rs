use super::types::{request, response};
use crate::{
    modules::otp::{
        codec,
        repository::{Channel, OtpKey, Purpose},
        service::IssueRequest,
    },
    types::Context,
    utils::response::{ApiError, ErrorKind},
};
use std::sync::Arc;

pub async fn service(ctx: Arc<Context>, payload: request::Payload) -> response::Response {
    let email = codec::normalize_email(&payload.body.email);

    ctx.identity
        .find_by_email(&email)
        .await
        .map_err(|_| ApiError::internal("Server error"))?
        .ok_or_else(|| ApiError::new(ErrorKind::NotFound, "Email tidak terdaftar."))?;

    ctx.otp
        .issue(
            IssueRequest {
                key: OtpKey::new(Purpose::PasswordReset, codec::encode_subject_key(&email)),
                subject: &email,
                channel: Channel::Email,
                destination: &email,
            },
            ctx.notifier.as_ref(),
        )
        .await?;

    Ok(response::Success::OtpSent)
}
