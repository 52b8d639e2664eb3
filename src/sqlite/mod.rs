// SQLite backend
//
// - config: URL/option parsing and the bb8 connection manager
// - query: result extraction
// - engine: `Engine` and `RawConnection` implementations

pub mod config;
pub mod engine;
pub mod query;

pub use config::{SqliteManager, SqliteOptions, SqliteTarget};
pub use engine::{SqliteEngine, SqliteRawConnection};
pub use query::build_result_set;
