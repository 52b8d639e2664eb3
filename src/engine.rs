//! Contracts between the connection registry and the database drivers.
//!
//! The registry never talks to a driver directly: it asks a [`ConnectionFactory`] for an
//! [`Engine`] and routes every keyword through that trait object. Backends live in
//! `crate::sqlite` and `crate::postgres`; tests plug in recording fakes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{ConnectionUrl, EngineOptions};
use crate::error::SqlKeywordError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Builds engines from connection strings.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Open (or lazily prepare) an engine for `url`.
    ///
    /// # Errors
    /// Returns the backend's error when the engine cannot be constructed.
    async fn create_engine(
        &self,
        url: &ConnectionUrl,
        options: &EngineOptions,
    ) -> Result<Arc<dyn Engine>, SqlKeywordError>;
}

/// A live, reusable connection or pool bound to one database.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Run one statement verbatim and buffer its result.
    async fn execute(&self, sql: &str) -> Result<ResultSet, SqlKeywordError>;

    /// Check out a driver-level connection for work outside the execute path.
    async fn raw_connection(&self) -> Result<Box<dyn RawConnection>, SqlKeywordError>;

    /// Release the engine's resources. Later calls on a disposed engine fail.
    async fn dispose(&self) -> Result<(), SqlKeywordError>;

    /// Switch statement echo on or off. Engines without an echo log ignore it.
    fn set_echo(&self, _enabled: bool) {}
}

/// A checked-out driver connection used for stored procedure calls.
#[async_trait]
pub trait RawConnection: Send {
    /// Open a cursor, invoke the procedure with positional parameters, close the cursor.
    async fn callproc(
        &mut self,
        name: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlKeywordError>;

    async fn commit(&mut self) -> Result<(), SqlKeywordError>;

    /// Hand the connection back. Must be idempotent-safe to call from `Drop`.
    fn close(&mut self);
}

/// Scope guard that closes a [`RawConnection`] exactly once, on every exit path.
pub struct RawConnectionGuard {
    conn: Option<Box<dyn RawConnection>>,
}

impl RawConnectionGuard {
    #[must_use]
    pub fn new(conn: Box<dyn RawConnection>) -> Self {
        Self { conn: Some(conn) }
    }

    /// # Errors
    /// Returns `SqlKeywordError::ConnectionError` if the guard was already released.
    pub fn get_mut(&mut self) -> Result<&mut dyn RawConnection, SqlKeywordError> {
        match self.conn.as_deref_mut() {
            Some(conn) => Ok(conn),
            None => Err(SqlKeywordError::ConnectionError(
                "raw connection already released".into(),
            )),
        }
    }

    /// Close now instead of waiting for drop.
    pub fn release(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            conn.close();
        }
    }
}

impl Drop for RawConnectionGuard {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for RawConnectionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawConnectionGuard")
            .field("open", &self.conn.is_some())
            .finish()
    }
}
