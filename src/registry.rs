use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{ConnectParams, ConnectionUrl, redact_connection_string};
use crate::engine::{ConnectionFactory, Engine, RawConnectionGuard};
use crate::error::SqlKeywordError;
use crate::query_template::render_template;
use crate::results::{CustomDbRow, ResultSet};
use crate::session::{Session, SessionOptions};
use crate::sql_text::prepare_script;
use crate::types::{DatabaseType, RowValues};

/// How a caller names a registered connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionRef {
    Index(usize),
    Alias(String),
}

impl From<usize> for ConnectionRef {
    fn from(index: usize) -> Self {
        ConnectionRef::Index(index)
    }
}

impl From<&str> for ConnectionRef {
    fn from(alias: &str) -> Self {
        ConnectionRef::Alias(alias.to_string())
    }
}

impl From<String> for ConnectionRef {
    fn from(alias: String) -> Self {
        ConnectionRef::Alias(alias)
    }
}

impl std::fmt::Display for ConnectionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionRef::Index(idx) => write!(f, "{idx}"),
            ConnectionRef::Alias(alias) => f.write_str(alias),
        }
    }
}

/// Lowercase and drop whitespace, so `My Conn` and `myconn` name the same connection.
fn normalize_alias(alias: &str) -> String {
    alias
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

struct RegisteredEngine {
    engine: Arc<dyn Engine>,
    dialect: DatabaseType,
}

/// Aliased engine handles, the current selection and one lazily created session per handle.
///
/// A registry is an ordinary value: each test context owns its own and passes it around.
pub struct ConnectionRegistry {
    factory: Arc<dyn ConnectionFactory>,
    connections: BTreeMap<usize, RegisteredEngine>,
    aliases: HashMap<String, usize>,
    sessions: HashMap<usize, Arc<Session>>,
    current: Option<usize>,
    last_index: usize,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new(factory: Arc<dyn ConnectionFactory>) -> Self {
        Self {
            factory,
            connections: BTreeMap::new(),
            aliases: HashMap::new(),
            sessions: HashMap::new(),
            current: None,
            last_index: 0,
        }
    }

    /// Open an engine, register it under the next index and make it current.
    ///
    /// # Errors
    /// Returns `ConfigError` for an unusable connection string, or the factory's error.
    pub async fn connect(&mut self, params: &ConnectParams) -> Result<usize, SqlKeywordError> {
        let connect_str = params.connection_string()?;
        debug!(
            "Connection String: {}",
            redact_connection_string(&connect_str)
        );
        let url = ConnectionUrl::parse(&connect_str)?;
        let engine = self.factory.create_engine(&url, &params.options).await?;
        Ok(self.register(engine, url.dialect(), params.alias.as_deref()))
    }

    /// Register an engine that was built outside the factory.
    pub fn register(
        &mut self,
        engine: Arc<dyn Engine>,
        dialect: DatabaseType,
        alias: Option<&str>,
    ) -> usize {
        self.last_index += 1;
        let index = self.last_index;
        self.connections
            .insert(index, RegisteredEngine { engine, dialect });
        if let Some(alias) = alias {
            self.aliases.insert(normalize_alias(alias), index);
        }
        self.current = Some(index);
        index
    }

    /// Resolve an index or alias to a registered index. Aliases ignore case and whitespace and
    /// win over numeric parsing.
    ///
    /// # Errors
    /// Returns `NotFound` when nothing matches.
    pub fn resolve(&self, target: &ConnectionRef) -> Result<usize, SqlKeywordError> {
        let index = match target {
            ConnectionRef::Index(idx) => Some(*idx),
            ConnectionRef::Alias(name) => self
                .aliases
                .get(&normalize_alias(name))
                .copied()
                .or_else(|| name.trim().parse::<usize>().ok()),
        };
        index
            .filter(|idx| self.connections.contains_key(idx))
            .ok_or_else(|| SqlKeywordError::NotFound(target.to_string()))
    }

    /// Make another connection current and return the previous current index.
    ///
    /// # Errors
    /// Returns `NotFound` and leaves the current connection unchanged when `target` is unknown.
    pub fn switch(
        &mut self,
        target: impl Into<ConnectionRef>,
    ) -> Result<Option<usize>, SqlKeywordError> {
        let index = self.resolve(&target.into())?;
        Ok(self.current.replace(index))
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Registered indices in ascending order.
    #[must_use]
    pub fn indices(&self) -> Vec<usize> {
        self.connections.keys().copied().collect()
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn current_entry(&self) -> Result<(usize, &RegisteredEngine), SqlKeywordError> {
        let index = self.current.ok_or(SqlKeywordError::NoCurrentConnection)?;
        self.connections
            .get(&index)
            .map(|entry| (index, entry))
            .ok_or(SqlKeywordError::NoCurrentConnection)
    }

    /// The current engine handle.
    ///
    /// # Errors
    /// Returns `NoCurrentConnection` when nothing is selected.
    pub fn current(&self) -> Result<Arc<dyn Engine>, SqlKeywordError> {
        self.current_entry().map(|(_, entry)| Arc::clone(&entry.engine))
    }

    /// The session of the current connection.
    ///
    /// # Errors
    /// Returns `NoCurrentConnection` or `SessionNotCreated`.
    pub fn session(&self) -> Result<Arc<Session>, SqlKeywordError> {
        let (index, _) = self.current_entry()?;
        self.sessions
            .get(&index)
            .cloned()
            .ok_or(SqlKeywordError::SessionNotCreated)
    }

    /// Return the current connection's session, creating it on first use.
    ///
    /// Creating the session also switches on the engine's statement echo.
    ///
    /// # Errors
    /// Returns `NoCurrentConnection` when nothing is selected.
    pub fn create_session(
        &mut self,
        options: SessionOptions,
    ) -> Result<Arc<Session>, SqlKeywordError> {
        let (index, entry) = self.current_entry()?;
        if let Some(session) = self.sessions.get(&index) {
            return Ok(Arc::clone(session));
        }
        let engine = Arc::clone(&entry.engine);
        engine.set_echo(true);
        debug!("Created session for connection {index}");
        let session = Arc::new(Session::new(index, engine, options));
        self.sessions.insert(index, Arc::clone(&session));
        Ok(session)
    }

    /// Run one statement verbatim on the current connection.
    ///
    /// # Errors
    /// Returns `NoCurrentConnection` or the backend's error.
    pub async fn execute(&self, sql: &str) -> Result<ResultSet, SqlKeywordError> {
        let engine = self.current()?;
        engine.execute(sql).await
    }

    /// Substitute `{}` fields textually, execute, and return every row.
    ///
    /// # Errors
    /// Returns `ParameterError` for a bad template, `NoCurrentConnection`, or the backend's error.
    pub async fn query(
        &self,
        template: &str,
        positional: &[String],
        named: &BTreeMap<String, String>,
    ) -> Result<Vec<CustomDbRow>, SqlKeywordError> {
        let engine = self.current()?;
        let sql = render_template(template, positional, named)?;
        debug!("Execute: {sql}");
        let rows = engine.execute(&sql).await?.into_rows();
        debug!("Results: {} row(s)", rows.len());
        Ok(rows)
    }

    /// Execute every statement of a UTF-8 script file in order.
    ///
    /// Statements already executed stay applied when a later one fails.
    ///
    /// # Errors
    /// Returns `ScriptRead` when the file cannot be read, `NoCurrentConnection`,
    /// `ParameterError` for an unterminated comment or literal, or the first backend error.
    pub async fn execute_script(&self, path: impl AsRef<Path>) -> Result<usize, SqlKeywordError> {
        let (_, entry) = self.current_entry()?;
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SqlKeywordError::ScriptRead {
                path: path.to_path_buf(),
                source,
            })?;
        let statements = prepare_script(&content, entry.dialect)?;
        for (n, statement) in statements.iter().enumerate() {
            debug!("Script {} statement {}: {statement}", path.display(), n + 1);
            entry.engine.execute(statement).await?;
        }
        Ok(statements.len())
    }

    /// Call a stored procedure on a raw connection of the current engine.
    ///
    /// The raw connection is committed and then closed on every exit path. When the call fails,
    /// a failing commit is logged and the call's error is returned.
    ///
    /// # Errors
    /// Returns `NoCurrentConnection`, or the backend error from checkout, call or commit.
    pub async fn call_procedure(
        &self,
        name: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlKeywordError> {
        let engine = self.current()?;
        let mut guard = RawConnectionGuard::new(engine.raw_connection().await?);
        let conn = guard.get_mut()?;
        let outcome = conn.callproc(name, params).await;
        let committed = conn.commit().await;
        guard.release();
        match (outcome, committed) {
            (Ok(results), Ok(())) => Ok(results),
            (Ok(_), Err(commit_err)) => Err(commit_err),
            (Err(call_err), Ok(())) => Err(call_err),
            (Err(call_err), Err(commit_err)) => {
                warn!("commit after failed call to {name} also failed: {commit_err}");
                Err(call_err)
            }
        }
    }

    /// Close the current connection: drop its session, forget it, then dispose the engine.
    ///
    /// # Errors
    /// Returns `NoCurrentConnection` when nothing is selected, or the dispose error.
    pub async fn close(&mut self) -> Result<(), SqlKeywordError> {
        let index = self.current.ok_or(SqlKeywordError::NoCurrentConnection)?;
        self.sessions.remove(&index);
        let entry = self
            .connections
            .remove(&index)
            .ok_or(SqlKeywordError::NoCurrentConnection)?;
        self.aliases.retain(|_, idx| *idx != index);
        self.current = None;
        entry.engine.dispose().await
    }

    /// Drop every session, then dispose every engine regardless of the current selection.
    ///
    /// Every engine is disposed even if one fails; the first failure is returned.
    ///
    /// # Errors
    /// Returns the first dispose error.
    pub async fn close_all(&mut self) -> Result<(), SqlKeywordError> {
        self.sessions.clear();
        self.aliases.clear();
        self.current = None;
        let mut first_err = None;
        for (index, entry) in std::mem::take(&mut self.connections) {
            if let Err(e) = entry.engine.dispose().await {
                warn!("dispose of connection {index} failed: {e}");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("indices", &self.indices())
            .field("aliases", &self.aliases)
            .field("current", &self.current)
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}
