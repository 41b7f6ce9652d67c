//! Digest delivery over SMTP.
//!
//! The digest email is a multipart/alternative message carrying both the
//! plain-text and HTML renderings, sent over STARTTLS with the account's
//! application credential. This is the system's only output channel, so a
//! transport failure propagates to the caller and fails the run; it is
//! never swallowed.

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::error::Error;
use std::time::Duration;
use tracing::{info, instrument};

const SMTP_TIMEOUT: Duration = Duration::from_secs(45);

/// Where and how to deliver the digest. Built once from CLI/env at startup.
#[derive(Debug, Clone)]
pub struct MailSettings {
    /// SMTP relay host (STARTTLS on the submission port).
    pub host: String,
    /// Account identity; also used as the From address.
    pub user: String,
    /// Application credential for the account.
    pub password: String,
    /// Recipient addresses, comma-separated.
    pub to: String,
}

/// Build the multipart digest message.
pub fn build_message(
    settings: &MailSettings,
    subject: &str,
    text: &str,
    html: &str,
) -> Result<Message, Box<dyn Error>> {
    let mut builder = Message::builder()
        .from(settings.user.parse::<Mailbox>()?)
        .subject(subject);
    for addr in settings.to.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        builder = builder.to(addr.parse::<Mailbox>()?);
    }
    let message =
        builder.multipart(MultiPart::alternative_plain_html(text.to_string(), html.to_string()))?;
    Ok(message)
}

/// Send the digest. Any transport or authentication failure is returned.
#[instrument(level = "info", skip_all, fields(host = %settings.host, to = %settings.to))]
pub async fn send_digest(
    settings: &MailSettings,
    subject: &str,
    text: &str,
    html: &str,
) -> Result<(), Box<dyn Error>> {
    let message = build_message(settings, subject, text, html)?;
    let creds = Credentials::new(settings.user.clone(), settings.password.clone());
    let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
        .credentials(creds)
        .timeout(Some(SMTP_TIMEOUT))
        .build();
    let response = mailer.send(message).await?;
    info!(code = %response.code(), "Digest sent");
    Ok(())
}
