use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing::debug;

use super::args::KeywordArgs;
use super::table::{KeywordHandler, KeywordTable, LibraryComponent};
use super::value::KeywordValue;
use crate::backends::DefaultConnectionFactory;
use crate::config::ConnectParams;
use crate::engine::ConnectionFactory;
use crate::error::SqlKeywordError;
use crate::registry::{ConnectionRef, ConnectionRegistry};
use crate::results::{CustomDbRow, ResultSet};
use crate::session::{Session, SessionOptions};
use crate::types::RowValues;

/// Blocking keyword library: one registry, one runtime, every call runs to completion.
pub struct KeywordLibrary {
    runtime: Runtime,
    registry: ConnectionRegistry,
    table: KeywordTable,
    components: Vec<Box<dyn LibraryComponent>>,
}

impl KeywordLibrary {
    /// Library with the built-in backends and no extension components.
    ///
    /// # Errors
    /// Returns `SqlKeywordError::Other` if the runtime cannot start.
    pub fn new() -> Result<Self, SqlKeywordError> {
        Self::with_components(Arc::new(DefaultConnectionFactory), Vec::new())
    }

    /// # Errors
    /// Returns `ConfigError` for conflicting keyword names, or `Other` if the runtime cannot
    /// start.
    pub fn with_components(
        factory: Arc<dyn ConnectionFactory>,
        components: Vec<Box<dyn LibraryComponent>>,
    ) -> Result<Self, SqlKeywordError> {
        let table = KeywordTable::build(&components)?;
        let runtime = Runtime::new()
            .map_err(|e| SqlKeywordError::Other(format!("failed to start tokio runtime: {e}")))?;
        Ok(Self {
            runtime,
            registry: ConnectionRegistry::new(factory),
            table,
            components,
        })
    }

    /// Keyword display names in registration order.
    #[must_use]
    pub fn keyword_names(&self) -> Vec<&str> {
        self.table.names()
    }

    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ConnectionRegistry {
        &mut self.registry
    }

    /// Drive a future on the library's runtime, e.g. to work with a [`Session`].
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Run a keyword by name with runner-style string arguments.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown keyword, otherwise the keyword's own error.
    pub fn run_keyword(
        &mut self,
        name: &str,
        args: KeywordArgs,
    ) -> Result<KeywordValue, SqlKeywordError> {
        let entry = self
            .table
            .lookup(name)
            .cloned()
            .ok_or_else(|| SqlKeywordError::NotFound(format!("keyword {name}")))?;
        debug!("Run keyword: {}", entry.name);
        let Self {
            runtime,
            registry,
            components,
            ..
        } = self;
        match entry.handler {
            KeywordHandler::Builtin(keyword) => runtime.block_on(keyword.run(registry, args)),
            KeywordHandler::Component(idx) => {
                let component = components.get(idx).ok_or_else(|| {
                    SqlKeywordError::Other(format!("no component registered at {idx}"))
                })?;
                runtime.block_on(component.run_keyword(&entry.name, registry, args))
            }
        }
    }

    /// # Errors
    /// See [`ConnectionRegistry::connect`].
    pub fn connect_to_db(&mut self, params: &ConnectParams) -> Result<usize, SqlKeywordError> {
        self.runtime.block_on(self.registry.connect(params))
    }

    /// # Errors
    /// See [`ConnectionRegistry::switch`].
    pub fn switch_connection(
        &mut self,
        target: impl Into<ConnectionRef>,
    ) -> Result<Option<usize>, SqlKeywordError> {
        self.registry.switch(target)
    }

    /// # Errors
    /// See [`ConnectionRegistry::create_session`].
    pub fn create_session(
        &mut self,
        options: SessionOptions,
    ) -> Result<Arc<Session>, SqlKeywordError> {
        self.registry.create_session(options)
    }

    /// # Errors
    /// See [`ConnectionRegistry::close`].
    pub fn close_connection(&mut self) -> Result<(), SqlKeywordError> {
        self.runtime.block_on(self.registry.close())
    }

    /// # Errors
    /// See [`ConnectionRegistry::close_all`].
    pub fn close_all_connections(&mut self) -> Result<(), SqlKeywordError> {
        self.runtime.block_on(self.registry.close_all())
    }

    /// # Errors
    /// See [`ConnectionRegistry::execute`].
    pub fn execute(&self, sql: &str) -> Result<ResultSet, SqlKeywordError> {
        self.runtime.block_on(self.registry.execute(sql))
    }

    /// # Errors
    /// See [`ConnectionRegistry::query`].
    pub fn query(
        &self,
        template: &str,
        positional: &[String],
        named: &BTreeMap<String, String>,
    ) -> Result<Vec<CustomDbRow>, SqlKeywordError> {
        self.runtime
            .block_on(self.registry.query(template, positional, named))
    }

    /// # Errors
    /// See [`ConnectionRegistry::execute_script`].
    pub fn execute_sql_script(&self, path: impl AsRef<Path>) -> Result<usize, SqlKeywordError> {
        self.runtime.block_on(self.registry.execute_script(path))
    }

    /// # Errors
    /// See [`ConnectionRegistry::call_procedure`].
    pub fn call_stored_procedure(
        &self,
        name: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlKeywordError> {
        self.runtime
            .block_on(self.registry.call_procedure(name, params))
    }
}

impl std::fmt::Debug for KeywordLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeywordLibrary")
            .field("registry", &self.registry)
            .field("keywords", &self.table.len())
            .field("components", &self.components.len())
            .finish_non_exhaustive()
    }
}
