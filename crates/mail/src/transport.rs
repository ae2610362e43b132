//! Message delivery.
//!
//! [`MailTransport`] is the seam the pipeline sends through. [`SmtpMailer`]
//! opens a fresh STARTTLS session for every message: EHLO, TLS upgrade,
//! AUTH with the static credentials, then submission to every envelope
//! recipient. Sessions are never pooled or reused between archives.

use std::future::Future;

use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::response::Code;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use dispatch_core::config::SmtpSettings;

/// SMTP reply codes that signal rejected credentials.
const AUTH_FAILURE_CODES: &[&str] = &["530", "534", "535"];

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TransmitError {
    /// The server rejected the credentials.
    #[error("SMTP authentication failed: {0}")]
    Authentication(String),

    /// Connection, TLS, or submission failure.
    #[error("SMTP transport error: {0}")]
    Transport(String),
}

impl TransmitError {
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

impl From<lettre::transport::smtp::Error> for TransmitError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        if is_auth_rejection(err.status()) {
            Self::Authentication(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// `true` when the server's reply code means the credentials were refused.
fn is_auth_rejection(code: Option<Code>) -> bool {
    code.is_some_and(|code| AUTH_FAILURE_CODES.contains(&code.to_string().as_str()))
}

// ---------------------------------------------------------------------------
// MailTransport
// ---------------------------------------------------------------------------

/// Delivers one composed message.
pub trait MailTransport: Send + Sync {
    fn send(&self, message: Message) -> impl Future<Output = Result<(), TransmitError>> + Send;
}

// ---------------------------------------------------------------------------
// SmtpMailer
// ---------------------------------------------------------------------------

pub struct SmtpMailer {
    settings: SmtpSettings,
}

impl SmtpMailer {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    fn session(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, TransmitError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.settings.host)?
            .port(self.settings.port)
            .credentials(Credentials::new(
                self.settings.username.clone(),
                self.settings.password.clone(),
            ))
            .build();
        Ok(transport)
    }
}

impl MailTransport for SmtpMailer {
    async fn send(&self, message: Message) -> Result<(), TransmitError> {
        tracing::info!(
            host = %self.settings.host,
            port = self.settings.port,
            "Connecting to SMTP server",
        );

        let transport = self.session()?;
        let response = transport.send(message).await?;

        tracing::debug!(
            user = %self.settings.username,
            code = %response.code(),
            "Message accepted",
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use lettre::message::header::ContentType;
    use lettre::transport::smtp::response::{Category, Detail, Severity};

    use super::*;

    fn message() -> Message {
        Message::builder()
            .from("alerts@example.com".parse().expect("from"))
            .to("ops@example.com".parse().expect("to"))
            .subject("probe")
            .header(ContentType::TEXT_PLAIN)
            .body("probe".to_string())
            .expect("message")
    }

    #[test]
    fn transmit_error_display() {
        let err = TransmitError::Authentication("535 5.7.8 bad credentials".to_string());
        assert_eq!(
            err.to_string(),
            "SMTP authentication failed: 535 5.7.8 bad credentials"
        );
        assert!(err.is_authentication());
        assert!(!TransmitError::Transport("timeout".to_string()).is_authentication());
    }

    #[test]
    fn auth_codes_are_recognised() {
        let rejected = [
            Code::new(Severity::PermanentNegativeCompletion, Category::Unspecified3, Detail::Zero),
            Code::new(Severity::PermanentNegativeCompletion, Category::Unspecified3, Detail::Four),
            Code::new(Severity::PermanentNegativeCompletion, Category::Unspecified3, Detail::Five),
        ];
        for code in rejected {
            assert!(is_auth_rejection(Some(code)), "{code} should be an auth rejection");
        }
    }

    #[test]
    fn other_codes_are_transport_failures() {
        let service_closing =
            Code::new(Severity::TransientNegativeCompletion, Category::Connections, Detail::One);
        let mailbox_unavailable =
            Code::new(Severity::PermanentNegativeCompletion, Category::MailSystem, Detail::Zero);

        assert!(!is_auth_rejection(Some(service_closing)));
        assert!(!is_auth_rejection(Some(mailbox_unavailable)));
        assert!(!is_auth_rejection(None));
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        // Port 1 on loopback refuses connections immediately.
        let mailer = SmtpMailer::new(SmtpSettings {
            host: "127.0.0.1".to_string(),
            port: 1,
            username: "user".to_string(),
            password: "pass".to_string(),
        });

        let result = mailer.send(message()).await;
        assert_matches!(result, Err(TransmitError::Transport(_)));
    }
}
