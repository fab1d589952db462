use crate::{
    types::Context,
    utils::response::{ApiError, ErrorKind},
};
use axum::{
    async_trait,
    extract::{Extension, FromRequestParts},
    http::request::Parts,
    RequestPartsExt,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use std::sync::Arc;

/// The signed in caller, resolved from `Authorization: Bearer <token>`.
#[derive(Clone, Debug)]
pub struct Auth {
    pub uid: String,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        let Extension(ctx) = parts
            .extract::<Extension<Arc<Context>>>()
            .await
            .map_err(|err| {
                tracing::error!("Context missing from request extensions: {}", err);
                ApiError::internal("Server error")
            })?;

        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| {
                ApiError::new(
                    ErrorKind::Unauthorized,
                    "Missing Authorization Bearer token",
                )
            })?;

        let token = bearer.token().trim();
        if token.is_empty() {
            return Err(ApiError::new(
                ErrorKind::Unauthorized,
                "Missing Authorization Bearer token",
            ));
        }

        ctx.identity
            .find_session_owner(token, ctx.clock.now())
            .await
            .map_err(|_| ApiError::internal("Server error"))?
            .map(|uid| Self { uid })
            .ok_or_else(|| ApiError::new(ErrorKind::Unauthorized, "Invalid session token"))
    }
}
