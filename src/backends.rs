use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{ConnectionUrl, EngineOptions};
use crate::engine::{ConnectionFactory, Engine};
use crate::error::SqlKeywordError;
use crate::types::DatabaseType;

/// Factory that picks a backend from the dialect part of the connection URL.
///
/// Dialects whose backend feature is disabled, or that have no backend at all, fail with
/// `SqlKeywordError::Unimplemented`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConnectionFactory;

#[async_trait]
impl ConnectionFactory for DefaultConnectionFactory {
    async fn create_engine(
        &self,
        url: &ConnectionUrl,
        options: &EngineOptions,
    ) -> Result<Arc<dyn Engine>, SqlKeywordError> {
        match url.dialect() {
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => {
                let engine = crate::sqlite::SqliteEngine::connect(url, options).await?;
                Ok(Arc::new(engine))
            }
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => {
                let engine = crate::postgres::PostgresEngine::connect(url, options)?;
                Ok(Arc::new(engine))
            }
            _ => Err(SqlKeywordError::Unimplemented(format!(
                "no backend available for dialect '{}'",
                url.dialect_name()
            ))),
        }
    }
}
