use crate::types::DatabaseType;

use super::scanner::{TokenKind, tokenize};

const KEYWORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "AS", "ASC", "BEGIN", "BETWEEN", "BY", "CALL", "CASE",
    "CHECK", "COLUMN", "COMMIT", "CONSTRAINT", "CREATE", "CROSS", "DECLARE", "DEFAULT", "DELETE",
    "DESC", "DISTINCT", "DROP", "ELSE", "END", "EXCEPT", "EXISTS", "FOREIGN", "FROM", "FULL",
    "FUNCTION", "GRANT", "GROUP", "HAVING", "IF", "IN", "INDEX", "INNER", "INSERT", "INTERSECT",
    "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE", "LIMIT", "NATURAL", "NOT", "NULL", "OFFSET",
    "ON", "OR", "ORDER", "OUTER", "PRIMARY", "PROCEDURE", "REFERENCES", "REPLACE", "RETURN",
    "RETURNS", "REVOKE", "RIGHT", "ROLLBACK", "SELECT", "SET", "TABLE", "THEN", "TRIGGER",
    "TRUNCATE", "UNION", "UNIQUE", "UPDATE", "USING", "VALUES", "VIEW", "WHEN", "WHERE", "WITH",
];

/// Keywords that start a new line when they appear outside parentheses.
const CLAUSES: &[&str] = &[
    "FROM", "WHERE", "GROUP", "ORDER", "HAVING", "LIMIT", "OFFSET", "UNION", "EXCEPT",
    "INTERSECT", "VALUES", "SET", "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "CROSS", "NATURAL",
];

const JOIN_MODIFIERS: &[&str] = &["INNER", "LEFT", "RIGHT", "FULL", "CROSS", "NATURAL", "OUTER"];

const INDENT: &str = "  ";

/// Upper-case keywords and reindent one statement.
///
/// Only whitespace and the case of unquoted keywords change; literals, quoted identifiers and
/// comments are copied byte for byte.
#[must_use]
pub fn format_statement(stmt: &str, dialect: DatabaseType) -> String {
    let mut out = String::with_capacity(stmt.len() + 16);
    let mut pending_space = false;
    let mut force_newline = false;
    let mut depth = 0usize;
    let mut prev_keyword: Option<String> = None;
    let mut open_between = false;

    for tok in tokenize(stmt, dialect) {
        if tok.kind == TokenKind::Whitespace {
            pending_space = true;
            continue;
        }

        let mut text = std::borrow::Cow::Borrowed(tok.text);
        let mut break_before: Option<&str> = None;

        if tok.kind == TokenKind::Word {
            let upper = tok.text.to_ascii_uppercase();
            if KEYWORDS.contains(&upper.as_str()) {
                if depth == 0 {
                    break_before = clause_break(&upper, prev_keyword.as_deref(), open_between);
                }
                if upper == "BETWEEN" {
                    open_between = true;
                } else if upper == "AND" && open_between {
                    open_between = false;
                }
                text = std::borrow::Cow::Owned(upper.clone());
                prev_keyword = Some(upper);
            } else {
                prev_keyword = None;
            }
        }

        if !out.is_empty() {
            if let Some(indent) = break_before {
                newline(&mut out, indent);
            } else if force_newline {
                newline(&mut out, "");
            } else if pending_space {
                out.push(' ');
            }
        }
        out.push_str(&text);

        match tok.kind {
            TokenKind::OpenParen => depth += 1,
            TokenKind::CloseParen => depth = depth.saturating_sub(1),
            _ => {}
        }
        // a line comment swallows everything up to the newline
        force_newline = tok.kind == TokenKind::LineComment;
        pending_space = false;
    }

    out.trim_end().to_string()
}

fn clause_break(
    upper: &str,
    prev_keyword: Option<&str>,
    open_between: bool,
) -> Option<&'static str> {
    match upper {
        "AND" if open_between => None,
        "AND" | "OR" => Some(INDENT),
        "JOIN" | "OUTER" if prev_keyword.is_some_and(|p| JOIN_MODIFIERS.contains(&p)) => None,
        "JOIN" | "OUTER" => Some(""),
        // `UNION ALL`, `ORDER BY`: only the first word breaks
        _ if CLAUSES.contains(&upper) => Some(""),
        _ => None,
    }
}

fn newline(out: &mut String, indent: &str) {
    let trimmed = out.trim_end_matches([' ', '\t']).len();
    out.truncate(trimmed);
    out.push('\n');
    out.push_str(indent);
}
