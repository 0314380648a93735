use bluelog_comments::notify::{Mail, MailError, MailTransport};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct SmtpEnv {
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_starttls: bool,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    #[serde(default = "default_mail_sender")]
    pub mail_sender: String,
}

fn default_smtp_port() -> u16 {
    465
}

fn default_mail_sender() -> String {
    "Bluelog <noreply@localhost>".to_owned()
}

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("MAIL_SENDER is not a valid mailbox: {0}")]
    Sender(#[from] lettre::address::AddressError),
    #[error("SMTP transport could not be configured: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Delivers notifications over SMTP, or only logs them when no host is configured.
#[derive(Debug)]
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    sender: Mailbox,
}

impl Mailer {
    pub fn new(env: &SmtpEnv) -> Result<Self, MailerError> {
        let sender = env.mail_sender.parse::<Mailbox>()?;

        let transport = match env.smtp_host.as_deref().map(str::trim) {
            Some(host) if !host.is_empty() => {
                let builder = if env.smtp_starttls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                } else {
                    AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                }?
                .port(env.smtp_port);

                let builder = match (&env.smtp_username, &env.smtp_password) {
                    (Some(username), Some(password)) => {
                        builder.credentials(Credentials::new(username.clone(), password.clone()))
                    }
                    _ => builder,
                };

                info!(host, port = env.smtp_port, "Sending notifications over SMTP");
                Some(builder.build())
            }
            _ => {
                warn!("SMTP_HOST not set, notifications will only be logged");
                None
            }
        };

        Ok(Self { transport, sender })
    }

    fn message(&self, mail: &Mail) -> Result<Message, MailError> {
        let recipient = mail.recipient.get().parse::<Mailbox>().map_err(MailError::new)?;

        Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(&mail.subject)
            .header(ContentType::TEXT_HTML)
            .body(mail.html.clone())
            .map_err(MailError::new)
    }
}

impl MailTransport for Mailer {
    async fn send(&self, mail: &Mail) -> Result<(), MailError> {
        let Some(transport) = &self.transport else {
            info!(
                subject = %mail.subject,
                recipient = mail.recipient.get(),
                "No SMTP transport, skipping send"
            );
            return Ok(());
        };

        let message = self.message(mail)?;
        transport.send(message).await.map_err(MailError::new)?;

        Ok(())
    }
}
