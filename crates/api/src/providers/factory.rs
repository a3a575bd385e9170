//! Provider construction and caching.

use std::sync::{Arc, Mutex, PoisonError};

use metrics::counter;
use tracing::{info, warn};

use super::{ConsoleProvider, EmailProvider, SendGridProvider, SmtpRelayProvider};
use crate::config::EmailConfig;

/// Handle owning the configured provider instance.
///
/// The first `get()` builds the provider from configuration, runs a single
/// `verify()` probe (warn-only) and caches the instance; later calls return
/// the same `Arc`. An unknown or misconfigured provider falls back to
/// console so delivery degrades instead of stopping, counted on the
/// `email_provider_fallback_total` metric.
pub struct ProviderHandle {
    config: EmailConfig,
    cached: Mutex<Option<Arc<dyn EmailProvider>>>,
}

impl ProviderHandle {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config,
            cached: Mutex::new(None),
        }
    }

    pub async fn get(&self) -> Arc<dyn EmailProvider> {
        if let Some(provider) = self
            .cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return provider;
        }

        let provider = self.build();
        match provider.verify().await {
            Ok(()) => info!(provider = provider.name(), "Email provider verified"),
            Err(e) => warn!(
                provider = provider.name(),
                error = %e,
                "Email provider verification failed, keeping it anyway"
            ),
        }

        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        // Lost races keep the first instance.
        if let Some(existing) = cached.clone() {
            return existing;
        }
        *cached = Some(Arc::clone(&provider));
        provider
    }

    /// Drop the cached instance so the next `get()` rebuilds from config.
    pub fn reset(&self) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn build(&self) -> Arc<dyn EmailProvider> {
        match self.config.provider.as_str() {
            "console" => Arc::new(ConsoleProvider::new()),
            "sendgrid" => match SendGridProvider::new(&self.config) {
                Ok(provider) => Arc::new(provider),
                Err(e) => self.fall_back("sendgrid", &e),
            },
            "smtp" => match SmtpRelayProvider::new(&self.config) {
                Ok(provider) => Arc::new(provider),
                Err(e) => self.fall_back("smtp", &e),
            },
            unknown => {
                warn!(provider = unknown, "Unknown email provider, using console");
                counter!("email_provider_fallback_total", "reason" => "unknown").increment(1);
                Arc::new(ConsoleProvider::new())
            }
        }
    }

    fn fall_back(&self, wanted: &str, error: &super::ProviderError) -> Arc<dyn EmailProvider> {
        warn!(
            provider = wanted,
            error = %error,
            "Email provider misconfigured, using console"
        );
        counter!("email_provider_fallback_total", "reason" => "misconfigured").increment(1);
        Arc::new(ConsoleProvider::new())
    }
}
