use super::service::service;
use super::types::request;
use crate::{types::Context, utils::extract::Payload};
use axum::{extract::State, response::IntoResponse};
use std::sync::Arc;

pub async fn handler(
    State(ctx): State<Arc<Context>>,
    Payload(body): Payload<request::Body>,
) -> impl IntoResponse {
    service(ctx, request::Payload { body }).await
}
