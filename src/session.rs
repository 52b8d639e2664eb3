use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tokio::sync::Mutex;

use crate::engine::Engine;
use crate::error::SqlKeywordError;
use crate::results::ResultSet;

/// Options for a session bound to the current connection.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Flush pending statements before every `execute`
    pub autoflush: bool,
    /// Execute statements immediately instead of queueing them
    pub autocommit: bool,
    /// Forget cached results on commit
    pub expire_on_commit: bool,
    /// Free-form metadata attached by the caller
    pub info: BTreeMap<String, JsonValue>,
    /// Options this crate does not interpret, kept for extensions
    pub extra: BTreeMap<String, String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            autoflush: true,
            autocommit: false,
            expire_on_commit: true,
            info: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl SessionOptions {
    #[must_use]
    pub fn with_autoflush(mut self, autoflush: bool) -> Self {
        self.autoflush = autoflush;
        self
    }

    #[must_use]
    pub fn with_autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    #[must_use]
    pub fn with_expire_on_commit(mut self, expire_on_commit: bool) -> Self {
        self.expire_on_commit = expire_on_commit;
        self
    }

    #[must_use]
    pub fn with_info(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.info.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Default)]
struct UnitOfWork {
    pending: Vec<String>,
    last_result: Option<ResultSet>,
}

/// Unit of work bound to one engine.
///
/// Statements added with [`Session::add`] are queued until [`Session::flush`] or
/// [`Session::commit`]; `autocommit` sessions run them immediately.
pub struct Session {
    connection_index: usize,
    engine: Arc<dyn Engine>,
    options: SessionOptions,
    state: Mutex<UnitOfWork>,
}

impl Session {
    pub(crate) fn new(
        connection_index: usize,
        engine: Arc<dyn Engine>,
        options: SessionOptions,
    ) -> Self {
        Self {
            connection_index,
            engine,
            options,
            state: Mutex::new(UnitOfWork::default()),
        }
    }

    /// Index of the connection this session is bound to.
    #[must_use]
    pub fn connection_index(&self) -> usize {
        self.connection_index
    }

    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    #[must_use]
    pub fn info(&self) -> &BTreeMap<String, JsonValue> {
        &self.options.info
    }

    /// Queue a statement, or run it right away for `autocommit` sessions.
    ///
    /// # Errors
    /// Propagates the backend error when an `autocommit` statement fails.
    pub async fn add(&self, statement: impl Into<String>) -> Result<(), SqlKeywordError> {
        let statement = statement.into();
        if self.options.autocommit {
            let result = self.engine.execute(&statement).await?;
            self.state.lock().await.last_result = Some(result);
        } else {
            self.state.lock().await.pending.push(statement);
        }
        Ok(())
    }

    /// Number of queued statements.
    pub async fn pending(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// Result of the most recent statement run through this session.
    pub async fn last_result(&self) -> Option<ResultSet> {
        self.state.lock().await.last_result.clone()
    }

    /// Run queued statements in order. On failure the failed statement and everything after it
    /// stay queued.
    ///
    /// # Errors
    /// Propagates the first backend error.
    pub async fn flush(&self) -> Result<(), SqlKeywordError> {
        let mut state = self.state.lock().await;
        while !state.pending.is_empty() {
            let result = self.engine.execute(&state.pending[0]).await?;
            state.pending.remove(0);
            state.last_result = Some(result);
        }
        Ok(())
    }

    /// Run a statement through the session, flushing first when `autoflush` is on.
    ///
    /// # Errors
    /// Propagates backend errors from the flush or the statement.
    pub async fn execute(&self, sql: &str) -> Result<ResultSet, SqlKeywordError> {
        if self.options.autoflush {
            self.flush().await?;
        }
        let result = self.engine.execute(sql).await?;
        self.state.lock().await.last_result = Some(result.clone());
        Ok(result)
    }

    /// Flush queued work.
    ///
    /// # Errors
    /// Propagates backend errors from the flush.
    pub async fn commit(&self) -> Result<(), SqlKeywordError> {
        self.flush().await?;
        if self.options.expire_on_commit {
            self.state.lock().await.last_result = None;
        }
        Ok(())
    }

    /// Discard queued statements.
    pub async fn rollback(&self) {
        self.state.lock().await.pending.clear();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("connection_index", &self.connection_index)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
