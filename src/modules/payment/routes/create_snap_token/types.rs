pub mod request {
    use crate::modules::auth::middleware::Auth;
    use crate::utils::validation::CheckOrder;
    use serde::Deserialize;
    use std::borrow::Cow;
    use validator::{Validate, ValidationError};

    fn required(order_id: &str) -> Result<(), ValidationError> {
        if order_id.trim().is_empty() {
            let mut err = ValidationError::new("order_id");
            err.message = Some(Cow::Borrowed("orderId required"));
            return Err(err);
        }
        Ok(())
    }

    #[derive(Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    pub struct Body {
        #[serde(default)]
        #[validate(custom(function = "required"))]
        pub order_id: String,
    }

    impl CheckOrder for Body {
        const FIELDS: &'static [&'static str] = &["order_id"];
    }

    pub struct Payload {
        pub body: Body,
        pub auth: Auth,
    }
}

pub mod response {
    use crate::utils::response::ApiError;
    use axum::{extract::Json, http::StatusCode, response::IntoResponse};
    use serde_json::json;

    pub enum Success {
        TokenCreated(String),
    }

    impl IntoResponse for Success {
        fn into_response(self) -> axum::response::Response {
            match self {
                Self::TokenCreated(token) => (
                    StatusCode::OK,
                    Json(json!({ "ok": true, "snapToken": token })),
                )
                    .into_response(),
            }
        }
    }

    pub type Response = Result<Success, ApiError>;
}
