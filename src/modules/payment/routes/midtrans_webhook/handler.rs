use super::service::service;
use super::types::{request, response};
use crate::{types::Context, utils::response::ApiError};
use axum::{
    body::Bytes,
    extract::{Query, State},
};
use std::sync::Arc;

pub async fn handler(
    State(ctx): State<Arc<Context>>,
    Query(query): Query<request::Query>,
    body: Bytes,
) -> response::Response {
    let raw = serde_json::from_slice::<serde_json::Value>(&body).map_err(|err| {
        tracing::debug!("Failed to parse notification body: {}", err);
        ApiError::validation("Body tidak valid.")
    })?;

    let notification = serde_json::from_value(raw.clone()).map_err(|err| {
        tracing::debug!("Failed to deserialize notification: {}", err);
        ApiError::validation("Body tidak valid.")
    })?;

    service(
        ctx,
        request::Payload {
            secret: query.secret,
            notification,
            raw,
        },
    )
    .await
}
