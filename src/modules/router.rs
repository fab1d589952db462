use super::{auth, chat, company, notification, payment, profile};
use crate::{types::Context, utils::response::method_not_allowed};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, Router},
};
use chrono::SecondsFormat;
use serde_json::json;
use std::sync::Arc;

async fn health(State(ctx): State<Arc<Context>>) -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "message": "SUPO backend alive",
        "timestamp": ctx.clock.now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

pub fn get_router() -> Router<Arc<Context>> {
    Router::new()
        .route("/health", get(health).fallback(method_not_allowed))
        .merge(auth::routes::get_router())
        .merge(profile::routes::get_router())
        .merge(company::routes::get_router())
        .merge(payment::routes::get_router())
        .merge(chat::routes::get_router())
        .merge(notification::routes::get_router())
}
