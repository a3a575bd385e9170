//! SendGrid transport over the v3 mail send API.

use std::time::Duration;

use tracing::{error, info};

use super::{EmailProvider, OutboundMessage, ProviderError, ProviderHealth, SendOutcome};
use crate::config::EmailConfig;

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";
const SENDGRID_SCOPES_URL: &str = "https://api.sendgrid.com/v3/scopes";

#[derive(Debug)]
pub struct SendGridProvider {
    client: reqwest::Client,
    api_key: String,
    sender_email: String,
    sender_name: String,
}

impl SendGridProvider {
    pub fn new(config: &EmailConfig) -> Result<Self, ProviderError> {
        if config.sendgrid_api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "sendgrid_api_key is empty".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.sendgrid_timeout_secs))
            .build()
            .map_err(|e| ProviderError::Transport(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: config.sendgrid_api_key.clone(),
            sender_email: config.sender_email.clone(),
            sender_name: config.sender_name.clone(),
        })
    }

    fn personalization(message: &OutboundMessage) -> serde_json::Value {
        let mut to = serde_json::json!({ "email": message.to });
        if let Some(name) = &message.to_name {
            to["name"] = serde_json::json!(name);
        }
        serde_json::json!({ "to": [to] })
    }

    /// One request per distinct (subject, body): SendGrid personalizations
    /// carry recipients, not content.
    async fn post_send(
        &self,
        personalizations: Vec<serde_json::Value>,
        subject: &str,
        body: &str,
    ) -> Result<SendOutcome, ProviderError> {
        let payload = serde_json::json!({
            "personalizations": personalizations,
            "from": {
                "email": self.sender_email,
                "name": self.sender_name
            },
            "subject": subject,
            "content": [{
                "type": "text/plain",
                "value": body
            }]
        });

        let response = self
            .client
            .post(SENDGRID_SEND_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("SendGrid request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            let message_id = response
                .headers()
                .get("X-Message-Id")
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            Ok(SendOutcome {
                provider_message_id: message_id,
            })
        } else {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_body, "SendGrid API error");
            Err(ProviderError::Rejected(format!(
                "SendGrid returned {status}: {error_body}"
            )))
        }
    }
}

#[async_trait::async_trait]
impl EmailProvider for SendGridProvider {
    fn name(&self) -> &'static str {
        "sendgrid"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<SendOutcome, ProviderError> {
        let outcome = self
            .post_send(
                vec![Self::personalization(message)],
                &message.subject,
                &message.body,
            )
            .await?;
        info!(to = %message.to, subject = %message.subject, "Email sent via SendGrid");
        Ok(outcome)
    }

    /// Batches messages sharing identical content into one API call with
    /// multiple personalizations; mixed-content batches fall apart into
    /// groups.
    async fn send_batch(
        &self,
        messages: &[OutboundMessage],
    ) -> Vec<Result<SendOutcome, ProviderError>> {
        let mut results: Vec<Option<Result<SendOutcome, ProviderError>>> =
            (0..messages.len()).map(|_| None).collect();

        let mut remaining: Vec<usize> = (0..messages.len()).collect();
        while let Some(&first) = remaining.first() {
            let subject = &messages[first].subject;
            let body = &messages[first].body;
            let group: Vec<usize> = remaining
                .iter()
                .copied()
                .filter(|&i| messages[i].subject == *subject && messages[i].body == *body)
                .collect();
            remaining.retain(|i| !group.contains(i));

            let personalizations = group
                .iter()
                .map(|&i| Self::personalization(&messages[i]))
                .collect();
            let outcome = self.post_send(personalizations, subject, body).await;
            for &i in &group {
                results[i] = Some(outcome.clone());
            }
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| Err(ProviderError::Transport("batch slot unfilled".into()))))
            .collect()
    }

    /// Validate the API key against the scopes endpoint; no mail is sent.
    async fn verify(&self) -> Result<(), ProviderError> {
        let response = self
            .client
            .get(SENDGRID_SCOPES_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("SendGrid probe failed: {e}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::Rejected(format!(
                "SendGrid key check returned {}",
                response.status()
            )))
        }
    }

    fn health(&self) -> ProviderHealth {
        ProviderHealth {
            name: "sendgrid".into(),
            configured: !self.api_key.is_empty(),
            verified: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> EmailConfig {
        EmailConfig {
            provider: "sendgrid".into(),
            sendgrid_api_key: "SG.test".into(),
            ..EmailConfig::default()
        }
    }

    #[test]
    fn test_requires_api_key() {
        let err = SendGridProvider::new(&EmailConfig::default()).unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn test_builds_with_key() {
        let provider = SendGridProvider::new(&config_with_key()).unwrap();
        assert_eq!(provider.name(), "sendgrid");
        assert!(provider.health().configured);
    }

    #[test]
    fn test_personalization_includes_name() {
        let message = OutboundMessage {
            to: "a@example.com".into(),
            to_name: Some("Ada".into()),
            subject: "s".into(),
            body: "b".into(),
        };
        let p = SendGridProvider::personalization(&message);
        assert_eq!(p["to"][0]["email"], "a@example.com");
        assert_eq!(p["to"][0]["name"], "Ada");
    }

    #[test]
    fn test_health_json_omits_key() {
        let provider = SendGridProvider::new(&config_with_key()).unwrap();
        let json = serde_json::to_string(&provider.health()).unwrap();
        assert!(!json.contains("SG.test"));
    }
}
