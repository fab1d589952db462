use super::types::{request, response};
use crate::{types::Context, utils::response::ApiError};
use std::sync::Arc;

pub async fn service(ctx: Arc<Context>, payload: request::Payload) -> response::Response {
    ctx.push_tokens
        .register(&payload.auth.uid, payload.body.token.trim())
        .await
        .map(|_| response::Success::PushTokenRegistered)
        .map_err(|_| ApiError::internal("Server error"))
}
