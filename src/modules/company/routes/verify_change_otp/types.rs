pub mod request {
    use crate::modules::{auth::middleware::Auth, company::valid_action, otp::rules::valid_otp};
    use crate::utils::validation::CheckOrder;
    use serde::Deserialize;
    use validator::Validate;

    #[derive(Deserialize, Validate)]
    pub struct Body {
        #[serde(default)]
        #[validate(custom(function = "valid_action"))]
        pub action: String,
        #[serde(default)]
        #[validate(custom(function = "valid_otp"))]
        pub otp: String,
    }

    impl CheckOrder for Body {
        const FIELDS: &'static [&'static str] = &["action", "otp"];
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
