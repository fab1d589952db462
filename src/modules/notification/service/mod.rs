pub mod email;
pub mod push;
pub mod whatsapp;

use crate::modules::otp::repository::{Channel, Purpose};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    NotSent(String),
    NotConfigured(&'static str),
    InvalidDestination(String),
    TimedOut,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotSent(reason) => write!(f, "{}", reason),
            Error::NotConfigured(what) => write!(f, "Missing {}", what),
            Error::InvalidDestination(destination) => {
                write!(f, "Invalid destination: {}", destination)
            }
            Error::TimedOut => write!(f, "Notification delivery timed out"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub struct OtpMessage<'a> {
    pub channel: Channel,
    pub purpose: Purpose,
    pub destination: &'a str,
    pub code: &'a str,
}

#[async_trait]
pub trait OtpDelivery: Send + Sync {
    async fn deliver(&self, message: OtpMessage<'_>) -> Result<()>;
}

/// Routes OTP messages to the mail or WhatsApp transport.
pub struct Notifier {
    mailer: Arc<dyn email::Mailer>,
    messenger: Arc<dyn whatsapp::Messenger>,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn email::Mailer>, messenger: Arc<dyn whatsapp::Messenger>) -> Self {
        Self { mailer, messenger }
    }
}

fn heading(purpose: Purpose) -> &'static str {
    match purpose {
        Purpose::PasswordReset => "Reset Password SUPO",
        Purpose::ChangeEmail => "Ganti Email SUPO",
        Purpose::ChangePhone => "Ganti Nomor HP SUPO",
        Purpose::VerifyEmail => "Verifikasi Email SUPO",
        Purpose::VerifyPhone => "Verifikasi Nomor HP SUPO",
    }
}

fn otp_email_subject(purpose: Purpose) -> String {
    format!("Kode OTP {}", heading(purpose))
}

fn otp_email_body(purpose: Purpose, code: &str) -> String {
    format!(
        r#"
      <div style="font-family:Arial,sans-serif;line-height:1.5">
        <h2>{}</h2>
        <p>Kode OTP kamu:</p>
        <div style="font-size:28px;font-weight:bold;letter-spacing:4px">{}</div>
        <p>Kode berlaku 10 menit. Jangan bagikan kode ini ke siapa pun.</p>
      </div>
    "#,
        heading(purpose),
        code
    )
}

fn otp_text_body(code: &str) -> String {
    format!(
        "Kode OTP SUPO kamu: {}\nBerlaku 10 menit. Jangan bagikan kode ini.",
        code
    )
}

#[async_trait]
impl OtpDelivery for Notifier {
    async fn deliver(&self, message: OtpMessage<'_>) -> Result<()> {
        match message.channel {
            Channel::Email => {
                self.mailer
                    .send_email(
                        message.destination,
                        &otp_email_subject(message.purpose),
                        otp_email_body(message.purpose, message.code),
                    )
                    .await
            }
            Channel::Messaging => {
                self.messenger
                    .send_text(message.destination, &otp_text_body(message.code))
                    .await
            }
        }
    }
}
