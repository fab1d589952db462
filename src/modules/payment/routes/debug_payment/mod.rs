mod handler;

use crate::{types::Context, utils::response::method_not_allowed};
use axum::routing::{get, Router};
use std::sync::Arc;

pub fn get_router() -> Router<Arc<Context>> {
    Router::new().route(
        "/debug/payment",
        get(handler::handler).fallback(method_not_allowed),
    )
}
