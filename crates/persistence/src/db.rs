//! Postgres pool construction.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Pool sizing and timeouts, resolved from the service configuration.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
}

/// Connect a pool, establishing the first connection eagerly so a bad
/// database URL fails at startup rather than on the first sweep.
pub async fn create_pool(settings: &PoolSettings) -> Result<PgPool, sqlx::Error> {
    options(settings).connect(&settings.url).await
}

/// Build a pool without touching the database; connections open on first
/// use. Router construction in unit tests relies on this.
pub fn create_lazy_pool(settings: &PoolSettings) -> Result<PgPool, sqlx::Error> {
    options(settings).connect_lazy(&settings.url)
}

fn options(settings: &PoolSettings) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.connect_timeout)
        .idle_timeout(settings.idle_timeout)
}
