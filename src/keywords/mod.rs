//! Keyword surface for test runners.
//!
//! A [`KeywordLibrary`] owns a [`ConnectionRegistry`](crate::registry::ConnectionRegistry) and a
//! tokio runtime. Keywords are looked up in a [`KeywordTable`] built once at construction from
//! the built-in keywords plus any [`LibraryComponent`] extensions; names that collide after
//! normalization are rejected there.
//!
//! ```no_run
//! use sql_keywords::keywords::{KeywordArgs, KeywordLibrary};
//!
//! let mut lib = KeywordLibrary::new()?;
//! lib.run_keyword("Connect To Db", KeywordArgs::positional(["sqlite:///tmp/demo.db"]))?;
//! let rows = lib.run_keyword("Query", KeywordArgs::positional(["SELECT {0} FROM t", "a"]))?;
//! println!("{}", rows.to_json());
//! # Ok::<(), sql_keywords::SqlKeywordError>(())
//! ```

pub mod args;
pub mod builtin;
pub mod library;
pub mod table;
pub mod value;

pub use args::{BoundArgs, KeywordArgs, Signature};
pub use builtin::BuiltinKeyword;
pub use library::KeywordLibrary;
pub use table::{KeywordEntry, KeywordHandler, KeywordTable, LibraryComponent, normalize_keyword};
pub use value::KeywordValue;
