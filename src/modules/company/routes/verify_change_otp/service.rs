use super::types::{request, response};
use crate::{
    modules::company::{self, repository::ChangeAction},
    types::Context,
    utils::response::ApiError,
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

    ctx.otp
        .verify(&company::change_key(&uid, action), payload.body.otp.trim())
        .await?;

    ctx.companies
        .mark_change_authorized(&uid, action, ctx.clock.now())
        .await
        .map_err(|_| ApiError::internal("Server error"))?;

    Ok(response::Success::OtpValid)
}
