mod create_snap_token;
mod debug_payment;
mod midtrans_webhook;

use crate::types::Context;
use axum::routing::Router;
use std::sync::Arc;

pub fn get_router() -> Router<Arc<Context>> {
    Router::new()
        .merge(create_snap_token::get_router())
        .merge(midtrans_webhook::get_router())
        .merge(debug_payment::get_router())
}
