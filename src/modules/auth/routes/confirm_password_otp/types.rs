pub mod request {
    use crate::modules::otp::rules::{strong_password, valid_email, valid_otp};
    use crate::utils::validation::CheckOrder;
    use serde::Deserialize;
    use validator::Validate;

    #[derive(Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    pub struct Body {
        #[serde(default)]
        #[validate(custom(function = "valid_email"))]
        pub email: String,
        #[serde(default)]
        #[validate(custom(function = "valid_otp"))]
        pub otp: String,
        #[serde(default)]
        #[validate(custom(function = "strong_password"))]
        pub new_password: String,
    }

    impl CheckOrder for Body {
        const FIELDS: &'static [&'static str] = &["email", "otp", "new_password"];
    }

    pub struct Payload {
        pub body: Body,
    }
}

pub mod response {
    use crate::utils::response::{ApiError, Message};
    use axum::response::IntoResponse;

    pub enum Success {
        PasswordReset,
    }

    impl IntoResponse for Success {
        fn into_response(self) -> axum::response::Response {
            match self {
                Self::PasswordReset => {
                    Message("Password berhasil direset. Silakan login ulang.").into_response()
                }
            }
        }
    }

    pub type Response = Result<Success, ApiError>;
}
