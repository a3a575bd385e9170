//! SMTP relay transport via lettre's async tokio transport.

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use super::{EmailProvider, OutboundMessage, ProviderError, ProviderHealth, SendOutcome};
use crate::config::EmailConfig;

#[derive(Debug)]
pub struct SmtpRelayProvider {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpRelayProvider {
    pub fn new(config: &EmailConfig) -> Result<Self, ProviderError> {
        if config.smtp_host.is_empty() {
            return Err(ProviderError::NotConfigured("smtp_host is empty".into()));
        }

        let from: Mailbox = format!("{} <{}>", config.sender_name, config.sender_email)
            .parse()
            .map_err(|e| ProviderError::NotConfigured(format!("sender address: {e}")))?;

        let mut builder = if config.smtp_use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| ProviderError::Transport(format!("SMTP relay: {e}")))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };
        builder = builder.port(config.smtp_port);
        if !config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ));
        }

        Ok(Self {
            mailer: builder.build(),
            from,
        })
    }
}

#[async_trait::async_trait]
impl EmailProvider for SmtpRelayProvider {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<SendOutcome, ProviderError> {
        let to: Mailbox = match &message.to_name {
            Some(name) => format!("{name} <{}>", message.to),
            None => message.to.clone(),
        }
        .parse()
        .map_err(|e| ProviderError::InvalidAddress(format!("{}: {e}", message.to)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&message.subject)
            .body(message.body.clone())
            .map_err(|e| ProviderError::Transport(format!("build message: {e}")))?;

        let response = self
            .mailer
            .send(email)
            .await
            .map_err(|e| ProviderError::Transport(format!("SMTP send: {e}")))?;

        let provider_message_id = response.message().next().map(String::from);
        info!(to = %message.to, subject = %message.subject, "Email sent via SMTP relay");
        Ok(SendOutcome {
            provider_message_id,
        })
    }

    /// Open-and-close a connection to the relay; no mail is sent.
    async fn verify(&self) -> Result<(), ProviderError> {
        let ok = self
            .mailer
            .test_connection()
            .await
            .map_err(|e| ProviderError::Transport(format!("SMTP probe: {e}")))?;
        if ok {
            Ok(())
        } else {
            Err(ProviderError::Transport("SMTP relay refused NOOP".into()))
        }
    }

    fn health(&self) -> ProviderHealth {
        ProviderHealth {
            name: "smtp".into(),
            configured: true,
            verified: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_host() {
        let err = SmtpRelayProvider::new(&EmailConfig::default()).unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn test_builds_without_credentials() {
        let config = EmailConfig {
            provider: "smtp".into(),
            smtp_host: "mail.example.com".into(),
            smtp_use_tls: false,
            ..EmailConfig::default()
        };
        let provider = SmtpRelayProvider::new(&config).unwrap();
        assert_eq!(provider.name(), "smtp");
    }

    #[test]
    fn test_rejects_bad_sender() {
        let config = EmailConfig {
            provider: "smtp".into(),
            smtp_host: "mail.example.com".into(),
            sender_email: "not an address".into(),
            smtp_use_tls: false,
            ..EmailConfig::default()
        };
        assert!(SmtpRelayProvider::new(&config).is_err());
    }
}
