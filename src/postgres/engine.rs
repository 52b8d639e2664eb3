use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use deadpool_postgres::{Object, Pool};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::config::PostgresOptions;
use super::query::{build_result_set, render_literal, validate_procedure_name};
use crate::config::{ConnectionUrl, EngineOptions};
use crate::engine::{Engine, RawConnection};
use crate::error::SqlKeywordError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// `PostgreSQL` engine backed by a deadpool pool of `tokio-postgres` clients.
pub struct PostgresEngine {
    pool: RwLock<Option<Pool>>,
    echo: AtomicBool,
}

impl PostgresEngine {
    /// Build the pool. No connection is opened until the first statement runs.
    ///
    /// # Errors
    /// Returns `SqlKeywordError` if the URL or options are invalid.
    pub fn connect(url: &ConnectionUrl, options: &EngineOptions) -> Result<Self, SqlKeywordError> {
        let opts = PostgresOptions::from_url(url, options)?;
        let pool = opts.create_pool()?;
        Ok(Self {
            pool: RwLock::new(Some(pool)),
            echo: AtomicBool::new(opts.echo),
        })
    }

    async fn pool(&self) -> Result<Pool, SqlKeywordError> {
        self.pool.read().await.clone().ok_or_else(|| {
            SqlKeywordError::ConnectionError("Postgres engine has been disposed".to_string())
        })
    }
}

#[async_trait]
impl Engine for PostgresEngine {
    async fn execute(&self, sql: &str) -> Result<ResultSet, SqlKeywordError> {
        if self.echo.load(Ordering::Relaxed) {
            info!("postgres: {sql}");
        }
        let client = self.pool().await?.get().await?;
        let messages = client.simple_query(sql).await?;
        Ok(build_result_set(messages))
    }

    async fn raw_connection(&self) -> Result<Box<dyn RawConnection>, SqlKeywordError> {
        let client = self.pool().await?.get().await?;
        client.batch_execute("BEGIN").await?;
        Ok(Box::new(PostgresRawConnection {
            client: Some(client),
            in_transaction: true,
            echo: self.echo.load(Ordering::Relaxed),
        }))
    }

    async fn dispose(&self) -> Result<(), SqlKeywordError> {
        if let Some(pool) = self.pool.write().await.take() {
            pool.close();
        }
        Ok(())
    }

    fn set_echo(&self, enabled: bool) {
        self.echo.store(enabled, Ordering::Relaxed);
    }
}

/// A checked-out client with an open transaction.
pub struct PostgresRawConnection {
    client: Option<Object>,
    in_transaction: bool,
    echo: bool,
}

impl PostgresRawConnection {
    fn client(&self) -> Result<&Object, SqlKeywordError> {
        self.client.as_ref().ok_or_else(|| {
            SqlKeywordError::ConnectionError("raw connection already closed".to_string())
        })
    }
}

#[async_trait]
impl RawConnection for PostgresRawConnection {
    async fn callproc(
        &mut self,
        name: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlKeywordError> {
        let name = validate_procedure_name(name)?;
        let args: Vec<String> = params.iter().map(render_literal).collect();
        let sql = format!("SELECT * FROM {name}({})", args.join(", "));
        if self.echo {
            info!("postgres: {sql}");
        }
        let messages = self.client()?.simple_query(&sql).await?;
        Ok(build_result_set(messages))
    }

    async fn commit(&mut self) -> Result<(), SqlKeywordError> {
        if self.in_transaction {
            // COMMIT on an aborted transaction rolls back and still succeeds
            self.client()?.batch_execute("COMMIT").await?;
            self.in_transaction = false;
        }
        Ok(())
    }

    fn close(&mut self) {
        if let Some(client) = self.client.take() {
            if self.in_transaction {
                warn!("closing raw connection with an open transaction; discarding it");
                drop(Object::take(client));
            }
        }
    }
}
