//! Relational-database keywords for test automation runners.
//!
//! The crate keeps a [`ConnectionRegistry`] of aliased engine handles, tracks the current one,
//! and lazily binds one [`Session`] per handle. Keywords (`Connect To Db`, `Query`,
//! `Execute Sql Script`, `Call Stored Procedure`, ...) are exposed through
//! [`keywords::KeywordLibrary`], which blocks the caller on an internal tokio runtime.
//!
//! Backends are selected by the dialect part of the connection URL:
//! - `sqlite` (feature `sqlite`): `rusqlite` behind a `bb8` pool
//! - `postgresql` (feature `postgres`): `tokio-postgres` behind `deadpool-postgres`

pub mod backends;
pub mod config;
pub mod engine;
pub mod error;
pub mod keywords;
pub mod prelude;
pub mod query_template;
pub mod registry;
pub mod results;
pub mod session;
pub mod sql_text;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use backends::DefaultConnectionFactory;
pub use config::{ConnectParams, ConnectParamsBuilder, ConnectionUrl, EngineOptions};
pub use engine::{ConnectionFactory, Engine, RawConnection, RawConnectionGuard};
pub use error::SqlKeywordError;
pub use registry::{ConnectionRef, ConnectionRegistry};
pub use results::{CustomDbRow, ResultSet};
pub use session::{Session, SessionOptions};
pub use types::{DatabaseType, RowValues};
