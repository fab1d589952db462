use super::types::{request, response};
use crate::{
    modules::profile,
    types::Context,
    utils::response::ApiError,
};
use std::sync::Arc;

pub async fn service(ctx: Arc<Context>, payload: request::Payload) -> response::Response {
    let uid = payload.auth.uid;
    let contact = profile::parse_contact(&payload.body.purpose)
        .ok_or_else(|| ApiError::validation("purpose tidak valid"))?;

    ctx.otp
        .verify(
            &profile::verification_key(&uid, contact),
            payload.body.otp.trim(),
        )
        .await?;

    ctx.identity
        .mark_contact_verified(&uid, contact, ctx.clock.now())
        .await
        .map_err(|_| ApiError::internal("Server error"))?;

    Ok(response::Success::OtpValid)
}
