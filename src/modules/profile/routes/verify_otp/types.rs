pub mod request {
    use crate::modules::{auth::middleware::Auth, otp::rules::valid_otp, profile::valid_purpose};
    use crate::utils::validation::CheckOrder;
    use serde::Deserialize;
    use validator::Validate;

    #[derive(Deserialize, Validate)]
    pub struct Body {
        #[serde(default)]
        #[validate(custom(function = "valid_otp"))]
        pub otp: String,
        #[serde(default)]
        #[validate(custom(function = "valid_purpose"))]
        pub purpose: String,
    }

    impl CheckOrder for Body {
        const FIELDS: &'static [&'static str] = &["purpose", "otp"];
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
        OtpValid,
    }

    impl IntoResponse for Success {
        fn into_response(self) -> axum::response::Response {
            match self {
                Self::OtpValid => Message("OTP valid.").into_response(),
            }
        }
    }

    pub type Response = Result<Success, ApiError>;
}
