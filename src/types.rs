pub use crate::utils::database;
use crate::modules::{
    auth::repository::{IdentityProvider, PgIdentityProvider},
    chat::repository::{ChatStore, PgChatStore},
    company::repository::{CompanyDirectory, PgCompanyDirectory},
    notification::{
        repository::push_token::{PgPushTokenStore, PushTokenStore},
        service::{
            email::SmtpMailer,
            push::{FcmPush, PushTransport},
            whatsapp::{WhatsAppConfig, WhatsAppMessenger},
            Notifier, OtpDelivery,
        },
    },
    order::repository::{OrderLedger, PgOrderLedger},
    otp::{repository::PgOtpRecordStore, service::OtpLifecycle},
    payment::{
        gateway::{MidtransConfig, MidtransSnap, PaymentGateway},
        reconciler::PaymentReconciler,
    },
};
use crate::utils::clock::{Clock, SystemClock};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use oauth_fcm::create_shared_token_manager;
use serde::Deserialize;
use std::env;
use std::sync::Arc;
use uri_parser::parse_uri;
use urlencoding::decode;

#[derive(Clone)]
pub struct AppContext {
    pub host: String,
    pub port: u32,
}

/// Midtrans settings as loaded. Keys stay optional so the diagnostics route
/// can report what is missing instead of the process refusing to start.
#[derive(Clone)]
pub struct PaymentContext {
    pub server_key: Option<String>,
    pub client_key: Option<String>,
    pub is_production: bool,
    pub webhook_secret: Option<String>,
}

pub struct Context {
    pub app: AppContext,
    pub payment: PaymentContext,
    pub clock: Arc<dyn Clock>,
    pub identity: Arc<dyn IdentityProvider>,
    pub companies: Arc<dyn CompanyDirectory>,
    pub otp: OtpLifecycle,
    pub notifier: Arc<dyn OtpDelivery>,
    pub orders: Arc<dyn OrderLedger>,
    pub reconciler: PaymentReconciler,
    pub gateway: Arc<dyn PaymentGateway>,
    pub chats: Arc<dyn ChatStore>,
    pub push_tokens: Arc<dyn PushTokenStore>,
    pub push: Arc<dyn PushTransport>,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u32,
}

#[derive(Clone)]
pub struct OtpConfig {
    pub pepper: String,
}

#[derive(Clone)]
pub struct MailConfig {
    pub sender: String,
    pub uri: String,
}

#[derive(Clone)]
pub struct GoogleConfig {
    pub fcm_credentials: String,
}

#[derive(Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub app: AppConfig,
    pub otp: OtpConfig,
    pub mail: MailConfig,
    pub whatsapp: WhatsAppConfig,
    pub google: GoogleConfig,
    pub payment: PaymentContext,
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL not set");
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u32>()
            .expect("Invalid PORT number");
        let otp_pepper = env::var("OTP_PEPPER").expect("OTP_PEPPER not set");
        let mail_sender = env::var("MAIL_SENDER").expect("MAIL_SENDER not set");
        let mail_uri = env::var("MAIL_URI").expect("MAIL_URI not set");
        let google_fcm_credentials =
            env::var("GOOGLE_FCM_CREDENTIALS").expect("GOOGLE_FCM_CREDENTIALS not set");

        Self {
            database: DatabaseConfig { url: database_url },
            app: AppConfig {
                host,
                port,
            },
            otp: OtpConfig { pepper: otp_pepper },
            mail: MailConfig {
                sender: mail_sender,
                uri: mail_uri,
            },
            whatsapp: WhatsAppConfig {
                token: optional_var("WHATSAPP_TOKEN"),
                phone_number_id: optional_var("WHATSAPP_PHONE_NUMBER_ID"),
                api_version: env::var("WHATSAPP_API_VERSION")
                    .unwrap_or_else(|_| "v20.0".to_string()),
            },
            google: GoogleConfig {
                fcm_credentials: google_fcm_credentials,
            },
            payment: PaymentContext {
                server_key: optional_var("MIDTRANS_SERVER_KEY"),
                client_key: optional_var("MIDTRANS_CLIENT_KEY"),
                is_production: env::var("MIDTRANS_IS_PRODUCTION")
                    .map(|value| value == "true")
                    .unwrap_or(false),
                webhook_secret: optional_var("SUPO_WEBHOOK_SECRET"),
            },
        }
    }
}

#[async_trait]
pub trait ToContext {
    async fn to_context(self) -> Context;
}

#[derive(Deserialize)]
struct GoogleProjectCredentials {
    project_id: String,
}

#[async_trait]
impl ToContext for Config {
    async fn to_context(self) -> Context {
        let db_conn = database::connect(self.database.url.as_str()).await;
        database::migrate(&db_conn).await;
        let pool = db_conn.pool;

        let parsed_mail_uri = parse_uri(&self.mail.uri).expect("Invalid mail uri");
        let mail_host = parsed_mail_uri.host.expect("Invalid mail host").to_string();
        let mail_user = parsed_mail_uri.user.expect("Invalid mail user");
        let mail_password = decode(mail_user.password.expect("Invalid mail password"))
            .expect("Invalid mail password")
            .to_string();
        let mail_user = decode(mail_user.name)
            .expect("Invalid mail user")
            .to_string();
        let mailer = SmtpMailer::new(&mail_host, mail_user, mail_password, &self.mail.sender)
            .unwrap_or_else(|err| panic!("Failed to set up mailer: {}", err));

        let google_fcm_credentials_decoded = BASE64_STANDARD
            .decode(self.google.fcm_credentials)
            .expect("GOOGLE_FCM_CREDENTIALS is not valid base64");
        let google_fcm_credentials_parsed =
            serde_json::from_slice::<GoogleProjectCredentials>(&google_fcm_credentials_decoded)
                .expect("GOOGLE_FCM_CREDENTIALS is not a service account");
        let google_fcm_token_manager =
            create_shared_token_manager::<&[u8]>(&google_fcm_credentials_decoded)
                .expect("Failed to create FCM token manager");

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let orders: Arc<dyn OrderLedger> = Arc::new(PgOrderLedger::new(pool.clone()));

        Context {
            app: AppContext {
                host: self.app.host,
                port: self.app.port,
            },
            otp: OtpLifecycle::new(
                Arc::new(PgOtpRecordStore::new(pool.clone())),
                clock.clone(),
                self.otp.pepper,
            ),
            notifier: Arc::new(Notifier::new(
                Arc::new(mailer),
                Arc::new(WhatsAppMessenger::new(self.whatsapp)),
            )),
            identity: Arc::new(PgIdentityProvider::new(pool.clone())),
            companies: Arc::new(PgCompanyDirectory::new(pool.clone())),
            reconciler: PaymentReconciler::new(orders.clone(), clock.clone()),
            orders,
            gateway: Arc::new(MidtransSnap::new(MidtransConfig {
                server_key: self.payment.server_key.clone(),
                client_key: self.payment.client_key.clone(),
                is_production: self.payment.is_production,
            })),
            payment: self.payment,
            chats: Arc::new(PgChatStore::new(pool.clone())),
            push_tokens: Arc::new(PgPushTokenStore::new(pool)),
            push: Arc::new(FcmPush::new(
                google_fcm_token_manager,
                google_fcm_credentials_parsed.project_id,
            )),
            clock,
        }
    }
}
