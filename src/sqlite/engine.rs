use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use tokio::sync::RwLock;
use tracing::info;

use super::config::{SqliteManager, SqliteOptions, SqliteTarget, run_blocking};
use super::query::run_statement;
use crate::config::{ConnectionUrl, EngineOptions};
use crate::engine::{Engine, RawConnection};
use crate::error::SqlKeywordError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// `SQLite` engine backed by a bb8 pool of `rusqlite` connections.
pub struct SqliteEngine {
    pool: RwLock<Option<Pool<SqliteManager>>>,
    echo: AtomicBool,
}

impl SqliteEngine {
    /// Build the pool and check out one connection so bad paths fail at connect time.
    ///
    /// # Errors
    /// Returns `SqlKeywordError` if the options are invalid or the database cannot be opened.
    pub async fn connect(
        url: &ConnectionUrl,
        options: &EngineOptions,
    ) -> Result<Self, SqlKeywordError> {
        let opts = SqliteOptions::from_url(url, options)?;
        let mut builder = Pool::<SqliteManager>::builder().max_size(opts.pool_size);
        if opts.target == SqliteTarget::Memory {
            builder = builder
                .min_idle(Some(1))
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        }
        let echo = opts.echo;
        let pool = builder.build(SqliteManager::new(opts)).await?;
        drop(pool.get().await?);
        Ok(Self {
            pool: RwLock::new(Some(pool)),
            echo: AtomicBool::new(echo),
        })
    }

    async fn pool(&self) -> Result<Pool<SqliteManager>, SqlKeywordError> {
        self.pool.read().await.clone().ok_or_else(|| {
            SqlKeywordError::ConnectionError("SQLite engine has been disposed".to_string())
        })
    }
}

#[async_trait]
impl Engine for SqliteEngine {
    async fn execute(&self, sql: &str) -> Result<ResultSet, SqlKeywordError> {
        if self.echo.load(Ordering::Relaxed) {
            info!("sqlite: {sql}");
        }
        let pool = self.pool().await?;
        let conn = pool.get().await?;
        let sql = sql.to_string();
        run_blocking(Arc::clone(&*conn), move |guard| run_statement(guard, &sql)).await
    }

    async fn raw_connection(&self) -> Result<Box<dyn RawConnection>, SqlKeywordError> {
        let pool = self.pool().await?;
        let conn = pool.get_owned().await?;
        Ok(Box::new(SqliteRawConnection { conn: Some(conn) }))
    }

    async fn dispose(&self) -> Result<(), SqlKeywordError> {
        // dropping the last pool handle closes idle connections
        self.pool.write().await.take();
        Ok(())
    }

    fn set_echo(&self, enabled: bool) {
        self.echo.store(enabled, Ordering::Relaxed);
    }
}

/// A checked-out `SQLite` connection. `SQLite` has no stored procedures, so `callproc` fails.
pub struct SqliteRawConnection {
    conn: Option<PooledConnection<'static, SqliteManager>>,
}

#[async_trait]
impl RawConnection for SqliteRawConnection {
    async fn callproc(
        &mut self,
        name: &str,
        _params: &[RowValues],
    ) -> Result<ResultSet, SqlKeywordError> {
        Err(SqlKeywordError::Unimplemented(format!(
            "SQLite does not support stored procedures (called {name})"
        )))
    }

    async fn commit(&mut self) -> Result<(), SqlKeywordError> {
        let conn = self.conn.as_ref().ok_or_else(|| {
            SqlKeywordError::ConnectionError("raw connection already closed".to_string())
        })?;
        run_blocking(Arc::clone(&**conn), |guard| {
            if !guard.is_autocommit() {
                guard.execute_batch("COMMIT")?;
            }
            Ok(())
        })
        .await
    }

    fn close(&mut self) {
        self.conn.take();
    }
}
