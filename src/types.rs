use std::fmt;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde_json::Value as JsonValue;

/// Values that can be stored in a database row or passed to a stored procedure.
///
/// Every backend materializes rows into the same enum so keyword results do not need to branch
/// on driver types:
/// ```rust
/// use sql_keywords::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // Try "YYYY-MM-DD HH:MM:SS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            // Try "YYYY-MM-DD HH:MM:SS.SSS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S.%3f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// JSON rendering used when keyword results leave the process (CLI output, runner bridges).
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            RowValues::Int(i) => JsonValue::from(*i),
            RowValues::Float(f) => JsonValue::from(*f),
            RowValues::Text(s) => JsonValue::from(s.as_str()),
            RowValues::Bool(b) => JsonValue::from(*b),
            RowValues::Timestamp(ts) => {
                JsonValue::from(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string())
            }
            RowValues::Null => JsonValue::Null,
            RowValues::JSON(v) => v.clone(),
            RowValues::Blob(bytes) => JsonValue::from(bytes.clone()),
        }
    }
}

impl fmt::Display for RowValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowValues::Int(i) => write!(f, "{i}"),
            RowValues::Float(v) => write!(f, "{v}"),
            RowValues::Text(s) => f.write_str(s),
            RowValues::Bool(b) => write!(f, "{b}"),
            RowValues::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
            RowValues::Null => f.write_str("NULL"),
            RowValues::JSON(v) => write!(f, "{v}"),
            RowValues::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

/// Database dialect recognized from a connection-string prefix (`dialect+driver`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum DatabaseType {
    /// `SQLite` database
    Sqlite,
    /// `PostgreSQL` database
    Postgres,
    /// `MySQL` / `MariaDB` family; connection strings get a UTF-8 charset clause
    Mysql,
    /// Any dialect without a dedicated branch
    Other,
}

impl DatabaseType {
    /// Classify a `dialect+driver` prefix or a full connection-string scheme.
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Self {
        let dialect = prefix
            .split("://")
            .next()
            .unwrap_or(prefix)
            .split('+')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if dialect.contains("mysql") {
            DatabaseType::Mysql
        } else if dialect == "sqlite" {
            DatabaseType::Sqlite
        } else if dialect == "postgres" || dialect == "postgresql" {
            DatabaseType::Postgres
        } else {
            DatabaseType::Other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_prefixes() {
        assert_eq!(DatabaseType::from_prefix("mysql+pymysql"), DatabaseType::Mysql);
        assert_eq!(DatabaseType::from_prefix("MySQL"), DatabaseType::Mysql);
        assert_eq!(DatabaseType::from_prefix("postgresql://u:p@h/db"), DatabaseType::Postgres);
        assert_eq!(DatabaseType::from_prefix("sqlite:///x.db"), DatabaseType::Sqlite);
        assert_eq!(DatabaseType::from_prefix("oracle+cx_oracle"), DatabaseType::Other);
    }

    #[test]
    fn bool_from_int() {
        assert_eq!(RowValues::Int(1).as_bool(), Some(&true));
        assert_eq!(RowValues::Int(0).as_bool(), Some(&false));
        assert_eq!(RowValues::Int(7).as_bool(), None);
    }

    #[test]
    fn timestamp_from_text() {
        let expected = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|d| d.and_hms_opt(3, 4, 5))
            .unwrap();
        let text = RowValues::Text("2024-01-02 03:04:05".into());
        assert_eq!(text.as_timestamp(), Some(expected));
        assert_eq!(RowValues::Timestamp(expected).as_timestamp(), Some(expected));
        assert_eq!(RowValues::Text("yesterday".into()).as_timestamp(), None);
        assert_eq!(RowValues::Int(1).as_timestamp(), None);
    }

    #[test]
    fn accessors_match_only_their_variant() {
        assert_eq!(RowValues::Int(4).as_int(), Some(&4));
        assert_eq!(RowValues::Float(4.0).as_int(), None);
        assert_eq!(RowValues::Float(0.5).as_float(), Some(0.5));
        assert_eq!(RowValues::Text("x".into()).as_text(), Some("x"));
        assert_eq!(RowValues::Blob(vec![1]).as_text(), None);
        assert_eq!(RowValues::Blob(vec![1]).as_blob(), Some(&[1u8][..]));
    }

    #[test]
    fn display_and_json() {
        assert_eq!(RowValues::Null.to_string(), "NULL");
        assert_eq!(RowValues::Text("x".into()).to_json(), JsonValue::from("x"));
        assert_eq!(RowValues::Int(3).to_json(), JsonValue::from(3));
    }
}
