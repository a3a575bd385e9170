//! Email provider abstraction.
//!
//! A provider turns an [`OutboundMessage`] into a delivery attempt against
//! some transport. Three transports are implemented: console (development,
//! always succeeds), SendGrid (HTTP API) and SMTP relay (lettre). The
//! [`factory::ProviderHandle`] picks one from configuration and falls back
//! to console when the configured provider cannot be built.

pub mod console;
pub mod factory;
pub mod sendgrid;
pub mod smtp_relay;

pub use console::ConsoleProvider;
pub use factory::ProviderHandle;
pub use sendgrid::SendGridProvider;
pub use smtp_relay::SmtpRelayProvider;

use serde::Serialize;
use thiserror::Error;

/// A single email ready to hand to a transport. Subject and body are fully
/// rendered; no template tokens remain by the time a message gets here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub body: String,
}

/// Result of a successful send.
#[derive(Debug, Clone, Default)]
pub struct SendOutcome {
    /// Transport-assigned message id, when the transport reports one.
    pub provider_message_id: Option<String>,
}

/// Errors a transport can produce.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("invalid recipient address: {0}")]
    InvalidAddress(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider rejected message: {0}")]
    Rejected(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Whether retrying the same message can plausibly succeed.
    /// Address and configuration problems will fail identically every time.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Transport(_) | ProviderError::Rejected(_)
        )
    }
}

/// Provider health as reported on the stats route. Carries no credentials
/// by construction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ProviderHealth {
    pub name: String,
    pub configured: bool,
    /// Result of the one-time connectivity probe, None when never run.
    pub verified: Option<bool>,
}

/// Abstraction over email transports.
#[async_trait::async_trait]
pub trait EmailProvider: Send + Sync {
    /// Transport name used in logs and delivery log rows.
    fn name(&self) -> &'static str;

    /// Attempt delivery of one message.
    async fn send(&self, message: &OutboundMessage) -> Result<SendOutcome, ProviderError>;

    /// Attempt delivery of a batch, one result per message in order.
    /// The default implementation sends sequentially; transports with a
    /// native batch call override this.
    async fn send_batch(
        &self,
        messages: &[OutboundMessage],
    ) -> Vec<Result<SendOutcome, ProviderError>> {
        let mut results = Vec::with_capacity(messages.len());
        for message in messages {
            results.push(self.send(message).await);
        }
        results
    }

    /// Probe transport connectivity without sending mail.
    async fn verify(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Current health snapshot.
    fn health(&self) -> ProviderHealth;
}
