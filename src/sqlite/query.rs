use std::sync::Arc;

use rusqlite::Statement;
use rusqlite::types::Value;

use crate::error::SqlKeywordError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns `SqlKeywordError` if the value cannot be read.
pub fn sqlite_extract_value_sync(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<RowValues, SqlKeywordError> {
    let value: Value = row.get(idx)?;
    match value {
        Value::Null => Ok(RowValues::Null),
        Value::Integer(i) => Ok(RowValues::Int(i)),
        Value::Real(f) => Ok(RowValues::Float(f)),
        Value::Text(s) => Ok(RowValues::Text(s)),
        Value::Blob(b) => Ok(RowValues::Blob(b)),
    }
}

/// Buffer every row a prepared statement produces.
///
/// # Errors
/// Returns `SqlKeywordError::SqliteError` if stepping or value extraction fails.
pub fn build_result_set(stmt: &mut Statement) -> Result<ResultSet, SqlKeywordError> {
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(10);
    result_set.set_column_names(Arc::new(column_names));

    let mut rows_iter = stmt.query([])?;
    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value_sync(row, i)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

/// Run one statement: row-producing statements are buffered, others report rows changed.
///
/// # Errors
/// Returns `SqlKeywordError::SqliteError` for prepare or execution failures.
pub fn run_statement(
    conn: &rusqlite::Connection,
    sql: &str,
) -> Result<ResultSet, SqlKeywordError> {
    let mut stmt = conn.prepare(sql)?;
    if stmt.column_count() > 0 {
        build_result_set(&mut stmt)
    } else {
        let changed = stmt.execute([])?;
        Ok(ResultSet::affected(changed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_rows_and_counts_changes() -> Result<(), SqlKeywordError> {
        let conn = rusqlite::Connection::open_in_memory()?;
        run_statement(&conn, "CREATE TABLE t (id INTEGER, name TEXT, score REAL, raw BLOB)")?;
        let inserted = run_statement(
            &conn,
            "INSERT INTO t VALUES (1, 'a', 1.5, x'00ff'), (2, NULL, NULL, NULL)",
        )?;
        assert_eq!(inserted.rows_affected, 2);

        let rs = run_statement(&conn, "SELECT id, name, score, raw FROM t ORDER BY id")?;
        assert_eq!(rs.len(), 2);
        let first = &rs.results[0];
        assert_eq!(first.get("id").and_then(RowValues::as_int), Some(&1));
        assert_eq!(first.get("name").and_then(RowValues::as_text), Some("a"));
        assert_eq!(first.get("score").and_then(RowValues::as_float), Some(1.5));
        assert_eq!(first.get("raw").and_then(RowValues::as_blob), Some(&[0u8, 255][..]));
        assert!(rs.results[1].get("name").is_some_and(RowValues::is_null));
        Ok(())
    }
}
