use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

use super::{MailError, Mailer, OutgoingMail};
use crate::config::SmtpConfig;

const IMPLICIT_TLS_PORT: u16 = 465;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    recipients: Vec<Mailbox>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let builder = if config.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        };
        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        let from: Mailbox = config.from.parse()?;

        let recipients = config
            .recipients
            .iter()
            .filter_map(|raw| match raw.parse::<Mailbox>() {
                Ok(mailbox) => Some(mailbox),
                Err(e) => {
                    warn!("Skipping invalid recipient '{}': {}", raw, e);
                    None
                }
            })
            .collect();

        Ok(Self {
            transport,
            from,
            recipients,
        })
    }

    /// Opens a connection and authenticates once, like a startup self-check.
    pub async fn verify(&self) -> bool {
        match self.transport.test_connection().await {
            Ok(true) => {
                info!("SMTP transport is ready to send messages");
                true
            }
            Ok(false) => {
                warn!("SMTP transport verification did not succeed");
                false
            }
            Err(e) => {
                warn!("SMTP transport verification failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        if self.recipients.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(mail.subject.clone());
        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }
        let message = builder.multipart(MultiPart::alternative_plain_html(
            mail.text.clone(),
            mail.html.clone(),
        ))?;

        let response = self.transport.send(message).await?;
        info!(
            "Notification email sent to {} recipients: {}",
            self.recipients.len(),
            response.code()
        );
        Ok(())
    }
}
