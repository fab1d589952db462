pub mod request {
    use crate::modules::auth::middleware::Auth;
    use crate::utils::validation::CheckOrder;
    use serde::Deserialize;
    use validator::Validate;

    #[derive(Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    pub struct Body {
        #[serde(default)]
        pub chat_id: String,
        #[serde(default)]
        pub receiver_uid: String,
        #[serde(default)]
        pub text: String,
        #[serde(default)]
        pub chat_title_for_sender: Option<String>,
        #[serde(default)]
        pub sender_name: Option<String>,
    }

    impl CheckOrder for Body {
        const FIELDS: &'static [&'static str] = &[];
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
        MessageSent(String),
    }

    impl IntoResponse for Success {
        fn into_response(self) -> axum::response::Response {
            match self {
                Self::MessageSent(id) => (
                    StatusCode::OK,
                    Json(json!({ "ok": true, "messageId": id })),
                )
                    .into_response(),
            }
        }
    }

    pub type Response = Result<Success, ApiError>;
}
