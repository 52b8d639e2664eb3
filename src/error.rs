use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the registry, the backends and the keyword surface.
#[derive(Debug, Error)]
pub enum SqlKeywordError {
    #[error("Current connection may be closed, or no connection has been created yet")]
    NoCurrentConnection,

    #[error("Non-existing index or alias '{0}'")]
    NotFound(String),

    #[error("Session is not created for the current connection")]
    SessionNotCreated,

    #[error("Failed to read SQL script '{}': {source}", path.display())]
    ScriptRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "sqlite")]
    #[error("SQLite pool error: {0}")]
    PoolErrorSqlite(String),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PoolErrorPostgres(#[from] deadpool_postgres::PoolError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),

    #[error("Other database error: {0}")]
    Other(String),
}

#[cfg(feature = "sqlite")]
impl From<bb8::RunError<SqlKeywordError>> for SqlKeywordError {
    fn from(err: bb8::RunError<SqlKeywordError>) -> Self {
        match err {
            bb8::RunError::User(inner) => inner,
            bb8::RunError::TimedOut => {
                SqlKeywordError::PoolErrorSqlite("timed out waiting for a connection".to_string())
            }
        }
    }
}
