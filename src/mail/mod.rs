pub mod smtp;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info};

pub use smtp::SmtpMailer;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("email delivery is disabled")]
    Disabled,

    #[error("no recipients configured")]
    NoRecipients,

    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("could not build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("smtp error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl OutgoingMail {
    /// Plain body plus an HTML rendering that wraps the text in a paragraph.
    pub fn plain(subject: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let html = format!("<p>{}</p>", escape_html(&text));
        Self {
            subject: subject.into(),
            text,
            html,
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Stand-in used when email is switched off.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        debug!("email disabled, dropping '{}'", mail.subject);
        Err(MailError::Disabled)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Fire-and-forget delivery; the caller's response never waits on SMTP.
pub fn spawn_send(mailer: Arc<dyn Mailer>, mail: OutgoingMail) {
    tokio::spawn(async move {
        match mailer.send(&mail).await {
            Ok(()) => info!("Background email sent: {}", mail.subject),
            Err(MailError::Disabled) => debug!("Background email skipped: {}", mail.subject),
            Err(e) => error!("Background email sending failed: {}", e),
        }
    });
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
