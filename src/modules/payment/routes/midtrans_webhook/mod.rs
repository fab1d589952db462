mod handler;
mod service;
mod types;

use crate::{types::Context, utils::response::method_not_allowed};
use axum::routing::{post, Router};
use std::sync::Arc;

pub fn get_router() -> Router<Arc<Context>> {
    Router::new().route(
        "/midtrans-webhook",
        post(handler::handler).fallback(method_not_allowed),
    )
}
