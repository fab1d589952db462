mod request_change_otp;
mod verify_change_otp;

use crate::types::Context;
use axum::routing::Router;
use std::sync::Arc;

pub fn get_router() -> Router<Arc<Context>> {
    Router::new().nest(
        "/company",
        Router::new()
            .merge(request_change_otp::get_router())
            .merge(verify_change_otp::get_router()),
    )
}

#[cfg(test)]
mod tests {
    use crate::modules::{
        company::{
            change_key,
            repository::{ChangeAction, CompanyContacts},
        },
        otp::{codec, repository::Purpose},
    };
    use crate::types::testing::TestApp;
    use crate::utils::clock::Clock;
    use axum::http::StatusCode;
    use serde_json::json;

    const TOKEN: Option<&str> = Some("token-uid-1");

    fn app() -> TestApp {
        let app = TestApp::new().with_account("uid-1", Some("owner@example.com"), None);
        app.companies.insert(
            "uid-1",
            CompanyContacts {
                email: Some("old@company.example".to_string()),
                phone: None,
            },
        );
        app
    }

    #[test]
    fn key_is_encoded_from_uid_and_action() {
        let key = change_key("uid-1", ChangeAction::ChangeEmail);
        assert_eq!(key.purpose, Purpose::ChangeEmail);
        assert_eq!(
            key.subject_key,
            codec::encode_subject_key("uid-1:change_email")
        );
    }

    #[tokio::test]
    async fn email_change_is_authorised_through_the_old_address() {
        let app = app();

        let (status, _) = app
            .post(
                "/api/company/request-change-otp",
                TOKEN,
                json!({ "action": "change_email", "channel": "email" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let sent = app.delivery.delivered();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].destination, "old@company.example");
        assert_eq!(sent[0].purpose, Purpose::ChangeEmail);

        let (status, body) = app
            .post(
                "/api/company/verify-change-otp",
                TOKEN,
                json!({ "action": "change_email", "otp": sent[0].code }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true, "message": "OTP valid." }));

        assert_eq!(
            app.companies.authorizations(),
            vec![("uid-1".to_string(), ChangeAction::ChangeEmail, app.clock.now())]
        );
    }

    #[tokio::test]
    async fn missing_old_contact_is_reported() {
        let app = app();

        let (status, body) = app
            .post(
                "/api/company/request-change-otp",
                TOKEN,
                json!({ "action": "change_phone", "channel": "whatsapp" }),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("Nomor HP lama belum ada."));
        assert!(app.delivery.delivered().is_empty());
    }

    #[tokio::test]
    async fn unknown_company_is_not_found() {
        let app = TestApp::new().with_account("uid-9", None, None);

        let (status, body) = app
            .post(
                "/api/company/request-change-otp",
                Some("token-uid-9"),
                json!({ "action": "change_email", "channel": "email" }),
            )
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], json!("Company tidak ditemukan"));
    }

    #[tokio::test]
    async fn invalid_action_is_rejected() {
        let app = app();

        let (status, body) = app
            .post(
                "/api/company/verify-change-otp",
                TOKEN,
                json!({ "action": "change_name", "otp": "123456" }),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("action tidak valid"));
    }

    #[tokio::test]
    async fn action_is_checked_before_the_other_fields() {
        let app = app();

        let (status, body) = app
            .post(
                "/api/company/request-change-otp",
                TOKEN,
                json!({ "action": "change_name", "channel": "sms" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("action tidak valid"));

        let (status, body) = app
            .post(
                "/api/company/verify-change-otp",
                TOKEN,
                json!({ "action": "change_name", "otp": "12" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("action tidak valid"));
    }

    #[tokio::test]
    async fn codes_lock_after_five_wrong_guesses() {
        let app = app();
        app.post(
            "/api/company/request-change-otp",
            TOKEN,
            json!({ "action": "change_email", "channel": "email" }),
        )
        .await;
        let code = app.delivery.last_code().unwrap();
        let wrong = if code == "000000" { "111111" } else { "000000" };

        for _ in 0..5 {
            let (status, body) = app
                .post(
                    "/api/company/verify-change-otp",
                    TOKEN,
                    json!({ "action": "change_email", "otp": wrong }),
                )
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["message"], json!("OTP salah."));
        }

        let (status, _) = app
            .post(
                "/api/company/verify-change-otp",
                TOKEN,
                json!({ "action": "change_email", "otp": code }),
            )
            .await;
        assert_ne!(status, StatusCode::OK);
        assert!(app.companies.authorizations().is_empty());
    }
}
