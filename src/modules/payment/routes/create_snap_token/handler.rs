use super::service::service;
use super::types::request;
use crate::{modules::auth::middleware::Auth, types::Context, utils::extract::Payload};
use axum::{extract::State, response::IntoResponse};
use std::sync::Arc;

pub async fn handler(
    State(ctx): State<Arc<Context>>,
    auth: Auth,
    Payload(body): Payload<request::Body>,
) -> impl IntoResponse {
    service(ctx, request::Payload { body, auth }).await
}
