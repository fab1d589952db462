use super::{Error, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: String) -> Result<()>;
}

pub struct SmtpMailer {
    sender: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(host: &str, user: String, password: String, sender: &str) -> Result<Self> {
        let sender = sender.parse::<Mailbox>().map_err(|err| {
            tracing::error!("Invalid mail sender {}: {}", sender, err);
            Error::NotConfigured("MAIL_SENDER")
        })?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|err| {
                tracing::error!("Failed to create smtp transport for {}: {}", host, err);
                Error::NotConfigured("MAIL_URI")
            })?
            .credentials(Credentials::new(user, password))
            .build();

        Ok(Self { sender, transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_email(&self, to: &str, subject: &str, body: String) -> Result<()> {
        let recipient = to.parse::<Mailbox>().map_err(|err| {
            tracing::error!("Invalid email recipient: {}", err);
            Error::InvalidDestination(to.to_string())
        })?;

        let email = Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)
            .map_err(|err| {
                tracing::error!("Failed to build email: {}", err);
                Error::NotSent(format!("Failed to build email: {}", err))
            })?;

        self.transport
            .send(email)
            .await
            .map(|_| ())
            .map_err(|err| {
                tracing::error!("Failed to send email: {}", err);
                Error::NotSent(format!("Failed to send email: {}", err))
            })
    }
}
