use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bb8::ManageConnection;
use tokio::sync::Mutex;

use crate::config::{ConnectionUrl, EngineOptions, parse_bool};
use crate::error::SqlKeywordError;

pub type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

const KNOWN_OPTIONS: &[&str] = &["busy_timeout_ms", "journal_mode", "foreign_keys"];

/// Where a `SQLite` engine keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    Memory,
    File(PathBuf),
}

impl SqliteTarget {
    /// Interpret `sqlite://` URLs the way the keyword libraries have always written them:
    /// `sqlite://` or `sqlite:///:memory:` for memory, `sqlite:///relative.db`,
    /// `sqlite:////absolute.db`.
    ///
    /// # Errors
    /// Returns `SqlKeywordError::ConfigError` when the URL names a host.
    pub fn from_url(url: &ConnectionUrl) -> Result<Self, SqlKeywordError> {
        let rest = url.remainder();
        let rest = rest.split_once('?').map_or(rest, |(path, _)| path);
        if rest.is_empty() {
            return Ok(SqliteTarget::Memory);
        }
        let path = rest.strip_prefix('/').ok_or_else(|| {
            SqlKeywordError::ConfigError(format!(
                "sqlite URLs take the form sqlite:///path, got {}",
                url.as_str()
            ))
        })?;
        if path.is_empty() || path == ":memory:" {
            Ok(SqliteTarget::Memory)
        } else {
            Ok(SqliteTarget::File(PathBuf::from(path)))
        }
    }
}

/// Options for configuring a `SQLite` engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteOptions {
    pub target: SqliteTarget,
    pub pool_size: u32,
    pub busy_timeout: Option<Duration>,
    pub journal_mode: Option<String>,
    pub foreign_keys: Option<bool>,
    pub echo: bool,
}

impl SqliteOptions {
    /// # Errors
    /// Returns `SqlKeywordError::ConfigError` or `ParameterError` for unsupported or malformed
    /// options.
    pub fn from_url(url: &ConnectionUrl, options: &EngineOptions) -> Result<Self, SqlKeywordError> {
        options.reject_unknown("sqlite", KNOWN_OPTIONS)?;
        let target = SqliteTarget::from_url(url)?;
        // every in-memory connection is its own database, so one connection is the database
        let pool_size = match target {
            SqliteTarget::Memory => 1,
            SqliteTarget::File(_) => options.pool_size.unwrap_or(5),
        };
        let busy_timeout = options
            .extra
            .get("busy_timeout_ms")
            .map(|ms| {
                ms.trim().parse::<u64>().map(Duration::from_millis).map_err(|e| {
                    SqlKeywordError::ParameterError(format!("busy_timeout_ms '{ms}': {e}"))
                })
            })
            .transpose()?;
        let foreign_keys = options
            .extra
            .get("foreign_keys")
            .map(String::as_str)
            .map(parse_bool)
            .transpose()?;
        let journal_mode = options
            .extra
            .get("journal_mode")
            .map(|mode| {
                if mode.chars().all(|c| c.is_ascii_alphabetic()) {
                    Ok(mode.to_ascii_uppercase())
                } else {
                    Err(SqlKeywordError::ParameterError(format!(
                        "journal_mode '{mode}' is not a journal mode"
                    )))
                }
            })
            .transpose()?;
        Ok(Self {
            target,
            pool_size,
            busy_timeout,
            journal_mode,
            foreign_keys,
            echo: options.echo,
        })
    }
}

/// bb8 manager handing out shared `rusqlite` connections.
#[derive(Debug, Clone)]
pub struct SqliteManager {
    opts: SqliteOptions,
}

impl SqliteManager {
    #[must_use]
    pub fn new(opts: SqliteOptions) -> Self {
        Self { opts }
    }

    fn open(opts: &SqliteOptions) -> Result<rusqlite::Connection, SqlKeywordError> {
        let conn = match &opts.target {
            SqliteTarget::Memory => rusqlite::Connection::open_in_memory()?,
            SqliteTarget::File(path) => rusqlite::Connection::open(path)?,
        };
        if let Some(timeout) = opts.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        if let Some(mode) = &opts.journal_mode {
            // journal_mode answers with the mode now in effect
            conn.query_row(&format!("PRAGMA journal_mode = {mode}"), [], |_row| Ok(()))?;
        }
        if let Some(enabled) = opts.foreign_keys {
            conn.execute_batch(if enabled {
                "PRAGMA foreign_keys = ON"
            } else {
                "PRAGMA foreign_keys = OFF"
            })?;
        }
        Ok(conn)
    }
}

impl ManageConnection for SqliteManager {
    type Connection = SharedSqliteConnection;
    type Error = SqlKeywordError;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let opts = self.opts.clone();
        async move {
            let conn = tokio::task::spawn_blocking(move || SqliteManager::open(&opts))
                .await
                .map_err(|e| {
                    SqlKeywordError::ConnectionError(format!("sqlite open join error: {e}"))
                })??;
            Ok(Arc::new(Mutex::new(conn)))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let handle = Arc::clone(conn);
        async move {
            run_blocking(handle, |guard| {
                guard
                    .query_row("SELECT 1", [], |_| Ok(()))
                    .map_err(SqlKeywordError::SqliteError)
            })
            .await
        }
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// Run synchronous `rusqlite` work on the blocking pool.
pub(crate) async fn run_blocking<F, R>(
    conn: SharedSqliteConnection,
    func: F,
) -> Result<R, SqlKeywordError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlKeywordError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| SqlKeywordError::ExecutionError(format!("sqlite spawn_blocking join error: {e}")))?
}
