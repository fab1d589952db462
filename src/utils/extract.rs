use super::{
    response::ApiError,
    validation::{self, CheckOrder},
};
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON body extractor that deserializes into a typed request and runs its
/// `Validate` rules before the handler sees it. The Content-Type header is not
/// required and an empty body is read as `{}`.
pub struct Payload<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + CheckOrder,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state).await.map_err(|err| {
            tracing::debug!("Failed to read request body: {}", err);
            ApiError::validation("Body tidak valid.")
        })?;

        let raw: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            body.as_ref()
        };

        let value = serde_json::from_slice::<T>(raw).map_err(|err| {
            tracing::debug!("Failed to deserialize request body: {}", err);
            ApiError::validation("Body tidak valid.")
        })?;

        value
            .validate()
            .map_err(|errors| validation::into_api_error(errors, T::FIELDS))?;

        Ok(Self(value))
    }
}
