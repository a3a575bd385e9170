//! Console transport: logs messages instead of sending them.
//!
//! Used in development and as the fallback when the configured provider
//! cannot be built. Always succeeds and retains every message for
//! inspection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::info;

use super::{EmailProvider, OutboundMessage, ProviderError, ProviderHealth, SendOutcome};

pub struct ConsoleProvider {
    sent: Mutex<Vec<OutboundMessage>>,
    counter: AtomicU64,
}

impl ConsoleProvider {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// Messages accepted so far, in send order.
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for ConsoleProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EmailProvider for ConsoleProvider {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<SendOutcome, ProviderError> {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        info!(
            to = %message.to,
            subject = %message.subject,
            body_len = message.body.len(),
            "Console email"
        );
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
        Ok(SendOutcome {
            provider_message_id: Some(format!("console-{seq}")),
        })
    }

    fn health(&self) -> ProviderHealth {
        ProviderHealth {
            name: "console".into(),
            configured: true,
            verified: Some(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &str) -> OutboundMessage {
        OutboundMessage {
            to: to.to_string(),
            to_name: None,
            subject: "Hello".to_string(),
            body: "Body".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_retains_messages() {
        let provider = ConsoleProvider::new();
        provider.send(&message("a@example.com")).await.unwrap();
        provider.send(&message("b@example.com")).await.unwrap();

        let sent = provider.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "a@example.com");
        assert_eq!(sent[1].to, "b@example.com");
    }

    #[tokio::test]
    async fn test_message_ids_are_sequential() {
        let provider = ConsoleProvider::new();
        let first = provider.send(&message("a@example.com")).await.unwrap();
        let second = provider.send(&message("b@example.com")).await.unwrap();
        assert_eq!(first.provider_message_id.as_deref(), Some("console-0"));
        assert_eq!(second.provider_message_id.as_deref(), Some("console-1"));
    }

    #[tokio::test]
    async fn test_batch_uses_default_sequential_send() {
        let provider = ConsoleProvider::new();
        let results = provider
            .send_batch(&[message("a@example.com"), message("b@example.com")])
            .await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(provider.sent().len(), 2);
    }
}
