use std::sync::Arc;

use tokio_postgres::SimpleQueryMessage;

use crate::error::SqlKeywordError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Buffer the messages of a simple (text protocol) query.
///
/// Values arrive as text; `NULL` becomes `RowValues::Null`. When several statements produce
/// rows, the last row-producing statement wins.
#[must_use]
pub fn build_result_set(messages: Vec<SimpleQueryMessage>) -> ResultSet {
    let mut result_set = ResultSet::default();
    let mut affected = 0usize;
    let mut saw_rows = false;

    for message in messages {
        match message {
            SimpleQueryMessage::Row(row) => {
                if !saw_rows {
                    let names: Vec<String> =
                        row.columns().iter().map(|c| c.name().to_string()).collect();
                    result_set = ResultSet::with_capacity(16);
                    result_set.set_column_names(Arc::new(names));
                    saw_rows = true;
                }
                let values = (0..row.len())
                    .map(|idx| {
                        row.get(idx)
                            .map_or(RowValues::Null, |text| RowValues::Text(text.to_string()))
                    })
                    .collect();
                result_set.add_row_values(values);
            }
            SimpleQueryMessage::CommandComplete(n) => {
                if saw_rows {
                    saw_rows = false;
                    affected = result_set.rows_affected;
                } else {
                    affected = usize::try_from(n).unwrap_or(usize::MAX);
                }
            }
            _ => {}
        }
    }

    if result_set.is_empty() {
        result_set.rows_affected = affected;
    }
    result_set
}

/// Render a value as a SQL literal for the text protocol.
///
/// Text is quoted and left untyped so the server coerces it to the procedure's parameter type.
#[must_use]
pub fn render_literal(value: &RowValues) -> String {
    match value {
        RowValues::Int(i) => i.to_string(),
        RowValues::Float(f) if f.is_finite() => f.to_string(),
        RowValues::Float(f) => quote(&f.to_string()),
        RowValues::Text(s) => quote(s),
        RowValues::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        RowValues::Timestamp(ts) => quote(&ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        RowValues::Null => "NULL".to_string(),
        RowValues::JSON(v) => quote(&v.to_string()),
        RowValues::Blob(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            format!("'\\x{hex}'::bytea")
        }
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Check that a procedure name is a plain, optionally schema-qualified identifier.
///
/// # Errors
/// Returns `SqlKeywordError::ParameterError` for anything else.
pub fn validate_procedure_name(name: &str) -> Result<&str, SqlKeywordError> {
    let valid = !name.is_empty()
        && name.split('.').all(|part| {
            part.chars()
                .next()
                .is_some_and(|c| c.is_alphabetic() || c == '_')
                && part.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        });
    if valid {
        Ok(name)
    } else {
        Err(SqlKeywordError::ParameterError(format!(
            "invalid stored procedure name '{name}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_literals() {
        assert_eq!(render_literal(&RowValues::Int(5)), "5");
        assert_eq!(render_literal(&RowValues::Text("o'neil".into())), "'o''neil'");
        assert_eq!(render_literal(&RowValues::Bool(true)), "TRUE");
        assert_eq!(render_literal(&RowValues::Null), "NULL");
        let ts = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|d| d.and_hms_opt(3, 4, 5))
            .unwrap();
        assert_eq!(
            render_literal(&RowValues::Timestamp(ts)),
            "'2024-01-02 03:04:05'"
        );
        assert_eq!(
            render_literal(&RowValues::JSON(serde_json::json!({"k": "it's"}))),
            "'{\"k\":\"it''s\"}'"
        );
        assert_eq!(render_literal(&RowValues::Float(f64::NAN)), "'NaN'");
        assert_eq!(
            render_literal(&RowValues::Blob(vec![0, 255])),
            "'\\x00ff'::bytea"
        );
    }

    #[test]
    fn procedure_names() {
        assert!(validate_procedure_name("add_user").is_ok());
        assert!(validate_procedure_name("app.add_user").is_ok());
        assert!(validate_procedure_name("x); DROP TABLE t; --").is_err());
        assert!(validate_procedure_name("").is_err());
        assert!(validate_procedure_name("a..b").is_err());
    }
}
