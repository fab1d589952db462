use crate::types::Context;
use axum::{
    extract::{Json, State},
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;

pub async fn handler(State(ctx): State<Arc<Context>>) -> impl IntoResponse {
    let server_key = ctx.payment.server_key.as_deref().unwrap_or_default();
    let client_key = ctx.payment.client_key.as_deref().unwrap_or_default();

    Json(json!({
        "hasServerKey": !server_key.is_empty(),
        "hasClientKey": !client_key.is_empty(),
        "serverKeyLength": server_key.len(),
        "clientKeyLength": client_key.len(),
        "isProduction": ctx.payment.is_production,
    }))
}
