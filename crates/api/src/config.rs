use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Convert into the persistence-layer pool settings.
    pub fn pool_settings(&self) -> persistence::db::PoolSettings {
        persistence::db::PoolSettings {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout: std::time::Duration::from_secs(self.connect_timeout_secs),
            idle_timeout: std::time::Duration::from_secs(self.idle_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Email delivery configuration.
///
/// Credentials in here must never leak into any HTTP response; the stats
/// and health routes report provider name and health flags only.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Provider: console, sendgrid or smtp.
    #[serde(default = "default_email_provider")]
    pub provider: String,

    /// Sender email address (From header).
    #[serde(default = "default_sender_email")]
    pub sender_email: String,

    /// Sender name (From header).
    #[serde(default = "default_sender_name")]
    pub sender_name: String,

    /// SendGrid API key (for sendgrid provider).
    #[serde(default)]
    pub sendgrid_api_key: String,

    /// Request timeout for the SendGrid API.
    #[serde(default = "default_sendgrid_timeout")]
    pub sendgrid_timeout_secs: u64,

    /// SMTP relay host (for smtp provider).
    #[serde(default)]
    pub smtp_host: String,

    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// SMTP username. Empty means unauthenticated relay.
    #[serde(default)]
    pub smtp_username: String,

    /// SMTP password.
    #[serde(default)]
    pub smtp_password: String,

    /// Whether to use STARTTLS for SMTP.
    #[serde(default = "default_smtp_tls")]
    pub smtp_use_tls: bool,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            provider: default_email_provider(),
            sender_email: default_sender_email(),
            sender_name: default_sender_name(),
            sendgrid_api_key: String::new(),
            sendgrid_timeout_secs: default_sendgrid_timeout(),
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_use_tls: default_smtp_tls(),
        }
    }
}

/// Background job intervals and delivery retry policy.
#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    /// How often the report sweep looks for due schedules.
    #[serde(default = "default_report_sweep_interval")]
    pub report_sweep_interval_secs: u64,

    /// How often due campaigns are moved into sending.
    #[serde(default = "default_campaign_dispatch_interval")]
    pub campaign_dispatch_interval_secs: u64,

    /// How often the delivery queue drain is kicked.
    #[serde(default = "default_queue_drain_interval")]
    pub queue_drain_interval_secs: u64,

    /// Pending recipients enqueued per campaign per dispatch pass.
    #[serde(default = "default_dispatch_batch_size")]
    pub dispatch_batch_size: i64,

    /// Retries after the first failed send attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before a failed send is attempted again.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            report_sweep_interval_secs: default_report_sweep_interval(),
            campaign_dispatch_interval_secs: default_campaign_dispatch_interval(),
            queue_drain_interval_secs: default_queue_drain_interval(),
            dispatch_batch_size: default_dispatch_batch_size(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_email_provider() -> String {
    "console".to_string()
}
fn default_sender_email() -> String {
    "reports@grantbridge.app".to_string()
}
fn default_sender_name() -> String {
    "Grantbridge".to_string()
}
fn default_sendgrid_timeout() -> u64 {
    10
}
fn default_smtp_port() -> u16 {
    587
}
fn default_smtp_tls() -> bool {
    true
}
fn default_report_sweep_interval() -> u64 {
    60
}
fn default_campaign_dispatch_interval() -> u64 {
    30
}
fn default_queue_drain_interval() -> u64 {
    5
}
fn default_dispatch_batch_size() -> i64 {
    100
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    5
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with GB__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("GB").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds the config entirely from embedded defaults so tests do not
    /// depend on config files being present.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30

            [database]
            url = "postgres://localhost/grantbridge_test"
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [email]
            provider = "console"
            sender_email = "test@example.com"
            sender_name = "Test"

            [jobs]
            report_sweep_interval_secs = 60
            campaign_dispatch_interval_secs = 30
            queue_drain_interval_secs = 5
            dispatch_batch_size = 100
            max_retries = 3
            retry_delay_secs = 5
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "database.url".to_string(),
            ));
        }
        // Unknown email providers are not rejected here: the provider
        // factory falls back to console with a warning instead.
        if self.jobs.dispatch_batch_size < 1 {
            return Err(ConfigValidationError::InvalidValue(
                "jobs.dispatch_batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the socket address to bind to.
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], self.server.port)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::load_for_test(&[]).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.email.provider, "console");
        assert_eq!(config.jobs.max_retries, 3);
        assert_eq!(config.jobs.retry_delay_secs, 5);
    }

    #[test]
    fn test_overrides() {
        let config = Config::load_for_test(&[
            ("server.port", "9090"),
            ("email.provider", "sendgrid"),
            ("email.sendgrid_api_key", "SG.test-key"),
            ("jobs.max_retries", "1"),
        ])
        .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.email.provider, "sendgrid");
        assert_eq!(config.email.sendgrid_api_key, "SG.test-key");
        assert_eq!(config.jobs.max_retries, 1);
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let config = Config::load_for_test(&[("jobs.dispatch_batch_size", "0")]).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_validate_requires_database_url() {
        let config = Config::load_for_test(&[("database.url", "")]).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_socket_addr() {
        let config = Config::load_for_test(&[("server.host", "127.0.0.1")]).unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8080");
    }
}
