pub mod request {
    use crate::modules::{
        auth::middleware::Auth,
        otp::rules::valid_channel,
        profile::valid_purpose,
    };
    use crate::utils::validation::CheckOrder;
    use serde::Deserialize;
    use validator::Validate;

    #[derive(Deserialize, Validate)]
    pub struct Body {
        #[serde(default)]
        #[validate(custom(function = "valid_purpose"))]
        pub purpose: String,
        #[serde(default)]
        #[validate(custom(function = "valid_channel"))]
        pub channel: String,
    }

    impl CheckOrder for Body {
        const FIELDS: &'static [&'static str] = &["purpose", "channel"];
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
        OtpSent,
    }

    impl IntoResponse for Success {
        fn into_response(self) -> axum::response::Response {
            match self {
                Self::OtpSent => Message("OTP terkirim.").into_response(),
            }
        }
    }

    pub type Response = Result<Success, ApiError>;
}
