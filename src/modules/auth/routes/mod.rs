mod confirm_password_otp;
mod request_password_otp;

use crate::types::Context;
use axum::routing::Router;
use std::sync::Arc;

pub fn get_router() -> Router<Arc<Context>> {
    Router::new().nest(
        "/auth",
        Router::new()
            .merge(request_password_otp::get_router())
            .merge(confirm_password_otp::get_router()),
    )
}
