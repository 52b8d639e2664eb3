use std::time::Duration;

use deadpool_postgres::{Manager, ManagerConfig, Pool};
use tokio_postgres::NoTls;

use crate::config::{ConnectionUrl, EngineOptions};
use crate::error::SqlKeywordError;

const KNOWN_OPTIONS: &[&str] = &["application_name", "connect_timeout"];

/// Options for configuring a `PostgreSQL` engine.
#[derive(Debug, Clone)]
pub struct PostgresOptions {
    pub pg_config: tokio_postgres::Config,
    pub pool_size: usize,
    pub echo: bool,
}

impl PostgresOptions {
    /// # Errors
    /// Returns `SqlKeywordError::ConfigError` for unsupported options, `ParameterError` for
    /// malformed values, or `PostgresError` when the URL is not a valid connection string.
    pub fn from_url(url: &ConnectionUrl, options: &EngineOptions) -> Result<Self, SqlKeywordError> {
        options.reject_unknown("postgres", KNOWN_OPTIONS)?;
        let mut pg_config: tokio_postgres::Config = url.without_driver().parse()?;

        if let Some(name) = options.extra.get("application_name") {
            pg_config.application_name(name);
        }
        if let Some(secs) = options.extra.get("connect_timeout") {
            let secs = secs.trim().parse::<u64>().map_err(|e| {
                SqlKeywordError::ParameterError(format!("connect_timeout '{secs}': {e}"))
            })?;
            pg_config.connect_timeout(Duration::from_secs(secs));
        }

        if pg_config.get_hosts().is_empty() {
            return Err(SqlKeywordError::ConfigError(
                "host is required".to_string(),
            ));
        }

        Ok(Self {
            pg_config,
            pool_size: options.pool_size.map_or(5, |n| n as usize),
            echo: options.echo,
        })
    }

    /// Create the pool. Connections are opened lazily on first checkout.
    ///
    /// # Errors
    /// Returns `SqlKeywordError::ConnectionError` if pool creation fails.
    pub fn create_pool(&self) -> Result<Pool, SqlKeywordError> {
        let manager =
            Manager::from_config(self.pg_config.clone(), NoTls, ManagerConfig::default());
        Pool::builder(manager)
            .max_size(self.pool_size)
            .build()
            .map_err(|e| {
                SqlKeywordError::ConnectionError(format!("Failed to create Postgres pool: {e}"))
            })
    }
}
