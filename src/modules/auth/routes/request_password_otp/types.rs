pub mod request {
    use crate::modules::otp::rules::valid_email;
    use crate::utils::validation::CheckOrder;
    use serde::Deserialize;
    use validator::Validate;

    #[derive(Deserialize, Validate)]
    pub struct Body {
        #[serde(default)]
        #[validate(custom(function = "valid_email"))]
        pub email: String,
    }

    impl CheckOrder for Body {
        const FIELDS: &'static [&'static str] = &["email"];
    }

    pub struct Payload {
        pub body: Body,
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
