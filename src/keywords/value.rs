use std::sync::Arc;

use serde_json::{Value as JsonValue, json};

use crate::results::{CustomDbRow, ResultSet};
use crate::session::Session;

/// What a keyword hands back to the runner.
#[derive(Debug, Clone)]
pub enum KeywordValue {
    None,
    /// Index of a newly registered connection
    Index(usize),
    /// Current index before a switch
    PreviousIndex(Option<usize>),
    Rows(Vec<CustomDbRow>),
    ResultSet(ResultSet),
    Session(Arc<Session>),
    /// Number of statements run
    Count(usize),
}

impl KeywordValue {
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            KeywordValue::Index(idx) => Some(*idx),
            KeywordValue::PreviousIndex(idx) => *idx,
            _ => None,
        }
    }

    #[must_use]
    pub fn as_rows(&self) -> Option<&[CustomDbRow]> {
        match self {
            KeywordValue::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_session(&self) -> Option<&Arc<Session>> {
        match self {
            KeywordValue::Session(session) => Some(session),
            _ => None,
        }
    }

    /// JSON rendering used by the command line runner.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            KeywordValue::None => JsonValue::Null,
            KeywordValue::Index(idx) | KeywordValue::Count(idx) => json!(idx),
            KeywordValue::PreviousIndex(idx) => json!(idx),
            KeywordValue::Rows(rows) => {
                JsonValue::Array(rows.iter().map(CustomDbRow::to_json).collect())
            }
            KeywordValue::ResultSet(rs) if rs.is_empty() => {
                json!({ "rows_affected": rs.rows_affected })
            }
            KeywordValue::ResultSet(rs) => rs.to_json(),
            KeywordValue::Session(session) => json!({
                "connection_index": session.connection_index(),
                "autoflush": session.options().autoflush,
                "autocommit": session.options().autocommit,
                "expire_on_commit": session.options().expire_on_commit,
                "info": session.info(),
            }),
        }
    }
}
