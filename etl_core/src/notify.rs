//! Fire-and-forget email notification.
//!
//! Delivery is strictly best-effort: [`dispatch`] swallows and logs every
//! notifier error so a broken relay can never block the pipeline or mask the
//! stage result it was reporting.

use lettre::{
    Message, SmtpTransport, Transport,
    message::Mailbox,
    transport::smtp::authentication::Credentials,
};
use secrecy::{ExposeSecret, SecretString};
use shared_utils::env::get_env_var;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::SmtpConfig;

/// Environment variable holding the SMTP relay password.
pub const SMTP_PASSWORD_VAR: &str = "SMTP_PASSWORD";

/// Errors raised while building or sending a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// A sender or recipient mailbox failed to parse.
    #[error("invalid mailbox '{0}'")]
    Address(String),

    /// The relay rejected the connection or the message.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// The message could not be assembled.
    #[error("message build error: {0}")]
    Message(#[from] lettre::error::Error),

    /// The relay password variable is not set.
    #[error(transparent)]
    MissingCredential(#[from] shared_utils::env::MissingEnvVarError),
}

/// Sends a subject + body to a recipient list.
pub trait Notifier {
    /// Deliver one message. Callers go through [`dispatch`], which makes
    /// delivery failures non-fatal.
    fn send(&self, subject: &str, body: &str, recipients: &[String]) -> Result<(), NotifyError>;
}

/// SMTP-backed notifier.
pub struct SmtpNotifier {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Build a notifier from the configured relay; the password is read from
    /// [`SMTP_PASSWORD_VAR`].
    pub fn from_config(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let password = SecretString::from(get_env_var(SMTP_PASSWORD_VAR)?);
        let credentials = Credentials::new(
            config.username.clone(),
            password.expose_secret().to_string(),
        );
        let transport = SmtpTransport::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|_| NotifyError::Address(config.from.clone()))?;
        Ok(Self { transport, from })
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, subject: &str, body: &str, recipients: &[String]) -> Result<(), NotifyError> {
        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for recipient in recipients {
            let mailbox: Mailbox = recipient
                .parse()
                .map_err(|_| NotifyError::Address(recipient.clone()))?;
            builder = builder.to(mailbox);
        }
        let message = builder.body(body.to_string())?;
        self.transport.send(&message)?;
        Ok(())
    }
}

/// Notifier used when no SMTP relay is configured.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn send(&self, subject: &str, _body: &str, _recipients: &[String]) -> Result<(), NotifyError> {
        debug!(subject, "notifications disabled; message dropped");
        Ok(())
    }
}

/// Best-effort delivery: errors are logged at `warn!` and never propagated.
pub fn dispatch(notifier: &dyn Notifier, subject: &str, body: &str, recipients: &[String]) {
    if recipients.is_empty() {
        debug!(subject, "no notification recipients configured");
        return;
    }
    if let Err(e) = notifier.send(subject, body, recipients) {
        warn!(subject, error = %e, "notification delivery failed");
    }
}
