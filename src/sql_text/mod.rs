//! SQL script handling: byte-order marks, comments, statement splitting and formatting.
//!
//! All functions work on a lightweight quote/comment-aware tokenizer. Terminators inside string
//! literals, quoted identifiers, comments and dollar-quoted bodies never split a statement, and
//! `BEGIN ... END` bodies of `CREATE FUNCTION/PROCEDURE/TRIGGER` (or `DECLARE` blocks) stay whole.

mod format;
mod parsers;
mod scanner;

pub use format::format_statement;

use scanner::{TokenKind, tokenize};

use crate::error::SqlKeywordError;
use crate::types::DatabaseType;

const BOM: char = '\u{feff}';

/// Remove every byte-order marker from decoded script text.
#[must_use]
pub fn strip_bom(text: &str) -> std::borrow::Cow<'_, str> {
    if text.contains(BOM) {
        std::borrow::Cow::Owned(text.replace(BOM, ""))
    } else {
        std::borrow::Cow::Borrowed(text)
    }
}

/// Drop `--` (and `#` for `MySQL`) line comments and `/* */` block comments.
#[must_use]
pub fn strip_comments(sql: &str, dialect: DatabaseType) -> String {
    let mut out = String::with_capacity(sql.len());
    for tok in tokenize(sql, dialect) {
        match tok.kind {
            TokenKind::LineComment => {}
            TokenKind::BlockComment => {
                // keep `a/**/b` from collapsing into one word
                if !out.is_empty() && !out.ends_with(|c: char| c.is_ascii_whitespace()) {
                    out.push(' ');
                }
            }
            _ => out.push_str(tok.text),
        }
    }
    out
}

/// Split text into statements at top-level terminators. Each statement keeps its trailing `;`
/// and is trimmed of surrounding whitespace; blank statements are skipped.
#[must_use]
pub fn split_statements(sql: &str, dialect: DatabaseType) -> Vec<String> {
    let mut statements = Vec::new();
    let mut block = BlockTracker::default();
    let mut start = 0;
    let mut offset = 0;

    for tok in tokenize(sql, dialect) {
        let end = offset + tok.text.len();
        match tok.kind {
            TokenKind::Word => block.observe(tok.text),
            TokenKind::Terminator if block.depth == 0 => {
                push_statement(&mut statements, &sql[start..end]);
                start = end;
                block = BlockTracker::default();
            }
            TokenKind::Terminator => block.after_end = false,
            _ => {}
        }
        offset = end;
    }
    push_statement(&mut statements, &sql[start..]);
    statements
}

/// Turn a whole script into executable statements: strip BOM and comments, split, trim
/// terminators, drop blanks and format each statement.
///
/// # Errors
/// Returns `SqlKeywordError::ParameterError` when a block comment, string literal, quoted
/// identifier or dollar-quoted body is never closed.
pub fn prepare_script(
    content: &str,
    dialect: DatabaseType,
) -> Result<Vec<String>, SqlKeywordError> {
    let content = strip_bom(content);
    if let Some(tok) = tokenize(&content, dialect).into_iter().find(|t| !t.closed) {
        let what = match tok.kind {
            TokenKind::BlockComment => "block comment",
            _ => "quoted literal",
        };
        let preview: String = tok.text.chars().take(30).collect();
        return Err(SqlKeywordError::ParameterError(format!(
            "unterminated {what} in script near `{preview}`"
        )));
    }
    let stripped = strip_comments(&content, dialect);
    Ok(split_statements(&stripped, dialect)
        .iter()
        .map(|stmt| stmt.trim_matches(';').trim())
        .filter(|stmt| !stmt.is_empty())
        .map(|stmt| format_statement(stmt, dialect))
        .collect())
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() && trimmed != ";" {
        statements.push(trimmed.to_string());
    }
}

/// Tracks `BEGIN`/`END` nesting for statements that carry procedural bodies.
#[derive(Debug, Default)]
struct BlockTracker {
    words_seen: usize,
    create: bool,
    procedural: bool,
    depth: usize,
    after_end: bool,
}

impl BlockTracker {
    fn observe(&mut self, word: &str) {
        let upper = word.to_ascii_uppercase();
        self.words_seen += 1;
        if self.words_seen == 1 {
            self.create = upper == "CREATE";
            self.procedural = upper == "DECLARE";
        }
        // CREATE [OR REPLACE] [DEFINER ...] FUNCTION|PROCEDURE|TRIGGER|PACKAGE
        if self.create
            && self.words_seen <= 6
            && matches!(upper.as_str(), "FUNCTION" | "PROCEDURE" | "TRIGGER" | "PACKAGE")
        {
            self.procedural = true;
        }
        if !self.procedural {
            return;
        }

        let after_end = std::mem::replace(&mut self.after_end, false);
        match upper.as_str() {
            "BEGIN" => self.depth += 1,
            "CASE" if !after_end => self.depth += 1,
            "END" => {
                self.depth = self.depth.saturating_sub(1);
                self.after_end = true;
            }
            // `END IF` / `END LOOP` close blocks that never opened a level
            "IF" | "LOOP" | "WHILE" | "REPEAT" if after_end => self.depth += 1,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_top_level_terminators() {
        let sql = "create table t (a text);\ninsert into t values ('x;y');\n\n;select 1";
        assert_eq!(
            split_statements(sql, DatabaseType::Other),
            vec![
                "create table t (a text);",
                "insert into t values ('x;y');",
                "select 1"
            ]
        );
    }

    #[test]
    fn trigger_body_stays_whole() {
        let sql = "CREATE TRIGGER trg AFTER INSERT ON t BEGIN UPDATE c SET n = n + 1; \
                   INSERT INTO log VALUES (1); END; SELECT 1;";
        let parts = split_statements(sql, DatabaseType::Sqlite);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].ends_with("END;"));
        assert_eq!(parts[1], "SELECT 1;");
    }

    #[test]
    fn plsql_end_if_does_not_close_block() {
        let sql = "CREATE PROCEDURE p AS BEGIN IF x THEN y; END IF; z; END; SELECT 2;";
        let parts = split_statements(sql, DatabaseType::Other);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1], "SELECT 2;");
    }

    #[test]
    fn keyword_aliases_outside_create_do_not_open_a_block() {
        let sql = "SELECT 'x' AS function, 1 AS begin; SELECT 2;";
        assert_eq!(
            split_statements(sql, DatabaseType::Other),
            vec!["SELECT 'x' AS function, 1 AS begin;", "SELECT 2;"]
        );
    }

    #[test]
    fn create_or_replace_function_stays_whole() {
        let sql = "CREATE OR REPLACE FUNCTION f() RETURNS int AS BEGIN RETURN 1; END; SELECT 3;";
        let parts = split_statements(sql, DatabaseType::Other);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1], "SELECT 3;");
    }

    #[test]
    fn transaction_begin_is_not_a_block() {
        let parts = split_statements(
            "BEGIN; INSERT INTO t VALUES (1); COMMIT;",
            DatabaseType::Other,
        );
        assert_eq!(parts, vec!["BEGIN;", "INSERT INTO t VALUES (1);", "COMMIT;"]);
    }

    #[test]
    fn strips_comments_outside_literals() {
        let sql = "select 1 -- trailing\n/* block */select '--not a comment'/**/x";
        assert_eq!(
            strip_comments(sql, DatabaseType::Other),
            "select 1 \nselect '--not a comment' x"
        );
    }

    #[test]
    fn prepares_script_with_bom() {
        let script = "\u{feff}-- setup\ncreate table t (a int);;\n\ninsert into t values (1);\n";
        assert_eq!(
            prepare_script(script, DatabaseType::Sqlite).unwrap(),
            vec!["CREATE TABLE t (a int)", "INSERT INTO t\nVALUES (1)"]
        );
    }

    #[test]
    fn unterminated_comment_fails_instead_of_dropping_statements() {
        let script = "select 1 /* unterminated ; comment\n; select 2;";
        let err = prepare_script(script, DatabaseType::Sqlite).unwrap_err();
        assert!(
            matches!(err, SqlKeywordError::ParameterError(ref m) if m.contains("block comment"))
        );

        let script = "insert into t values ('open);\nselect 2;";
        let err = prepare_script(script, DatabaseType::Sqlite).unwrap_err();
        assert!(
            matches!(err, SqlKeywordError::ParameterError(ref m) if m.contains("quoted literal"))
        );
    }
}
