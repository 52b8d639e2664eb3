// PostgreSQL backend
//
// - config: URL/option parsing and pool construction
// - query: simple-query result extraction and literal rendering
// - engine: `Engine` and `RawConnection` implementations

pub mod config;
pub mod engine;
pub mod query;

pub use config::PostgresOptions;
pub use engine::{PostgresEngine, PostgresRawConnection};
pub use query::{build_result_set, render_literal};
