//! Outbound verification mail via SMTP.
//!
//! [`Mailer`] wraps the `lettre` async SMTP transport to deliver the
//! email-verification link after password signup. When SMTP is not
//! configured the service runs without a mailer and signup simply skips
//! the verification mail.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;

/// Error type for mail delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

/// Sends verification emails through a configured SMTP relay.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl Mailer {
    /// Build the STARTTLS transport from SMTP settings.
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }

    /// Send the account verification link to `to_email`.
    pub async fn send_verification(
        &self,
        to_email: &str,
        verify_url: &str,
    ) -> Result<(), MailError> {
        let body = format!(
            "Welcome!\n\nPlease confirm your email address by opening the link below:\n\n\
             {verify_url}\n\nThe link is valid for 24 hours.\n"
        );

        let email = Message::builder()
            .from(self.from.parse()?)
            .to(to_email.parse()?)
            .subject("Confirm your email address")
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport.send(email).await?;
        tracing::info!(to = to_email, "Verification email sent");
        Ok(())
    }
}
