use super::types::{request, response};
use crate::{
    modules::otp::{
        codec,
        repository::{OtpKey, Purpose},
    },
    types::Context,
    utils::response::{ApiError, ErrorKind},
};
use std::sync::Arc;

pub async fn service(ctx: Arc<Context>, payload: request::Payload) -> response::Response {
    let email = codec::normalize_email(&payload.body.email);
    let key = OtpKey::new(Purpose::PasswordReset, codec::encode_subject_key(&email));

    ctx.otp.verify(&key, payload.body.otp.trim()).await?;

    // The code is spent at this point even if the account has since gone.
    let account = ctx
        .identity
        .find_by_email(&email)
        .await
        .map_err(|_| ApiError::internal("Server error"))?
        .ok_or_else(|| ApiError::new(ErrorKind::NotFound, "Email tidak terdaftar."))?;

    ctx.identity
        .set_password(&account.id, &payload.body.new_password)
        .await
        .map_err(|_| ApiError::internal("Server error"))?;

    ctx.identity
        .revoke_sessions(&account.id)
        .await
        .map_err(|_| ApiError::internal("Server error"))?;

    tracing::info!("Password of user {} was reset", account.id);

    Ok(response::Success::PasswordReset)
}
