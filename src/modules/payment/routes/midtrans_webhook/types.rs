pub mod request {
    use crate::modules::payment::reconciler::Notification;
    use serde::Deserialize;

    #[derive(Deserialize)]
    pub struct Query {
        pub secret: Option<String>,
    }

    pub struct Payload {
        pub secret: Option<String>,
        pub notification: Notification,
        pub raw: serde_json::Value,
    }
}

pub mod response {
    use crate::{modules::order::repository::OrderStatus, utils::response::ApiError};
    use axum::{extract::Json, http::StatusCode, response::IntoResponse};
    use serde_json::json;

    pub enum Success {
        Reconciled(OrderStatus),
    }

    impl IntoResponse for Success {
        fn into_response(self) -> axum::response::Response {
            match self {
                Self::Reconciled(status) => (
                    StatusCode::OK,
                    Json(json!({ "ok": true, "status": status.as_str() })),
                )
                    .into_response(),
            }
        }
    }

    pub type Response = Result<Success, ApiError>;
}
