//! Convenient imports for common functionality.

pub use crate::config::{ConnectParams, ConnectionUrl, EngineOptions};
pub use crate::engine::{ConnectionFactory, Engine, RawConnection};
pub use crate::error::SqlKeywordError;
pub use crate::keywords::{KeywordArgs, KeywordLibrary, KeywordValue, LibraryComponent};
pub use crate::registry::{ConnectionRef, ConnectionRegistry};
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::session::{Session, SessionOptions};
pub use crate::types::{DatabaseType, RowValues};
pub use crate::DefaultConnectionFactory;
