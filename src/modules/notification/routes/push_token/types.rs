pub mod request {
    use crate::modules::auth::middleware::Auth;
    use crate::utils::validation::CheckOrder;
    use serde::Deserialize;
    use validator::Validate;

    #[derive(Deserialize, Validate)]
    pub struct Body {
        #[serde(default)]
        #[validate(length(min = 1, max = 4096, message = "token is required"))]
        pub token: String,
    }

    impl CheckOrder for Body {
        const FIELDS: &'static [&'static str] = &["token"];
    }

    pub struct Payload {
        pub body: Body,
        pub auth: Auth,
    }
}

pub mod response {
    use crate::utils::response::{ApiError, Message};
    use axum::response::IntoResponse;

    pub enum Success {
        PushTokenRegistered,
    }

    impl IntoResponse for Success {
        fn into_response(self) -> axum::response::Response {
            match self {
                Self::PushTokenRegistered => Message("Push token registered").into_response(),
            }
        }
    }

    pub type Response = Result<Success, ApiError>;
}
