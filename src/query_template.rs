use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::error::SqlKeywordError;

/// Textual `{0}` / `{}` / `{name}` substitution for `Query`.
///
/// This is string templating, not parameter binding: the substituted values become part of the
/// SQL text. Existing test suites depend on it (table and column names are routinely templated),
/// so it stays, but it must never see untrusted input.
///
/// The template is always rendered, even with no values: `{{` and `}}` produce literal braces
/// and any other brace must form a field that resolves. A JSON literal therefore needs doubled
/// braces, as in `'{{"a": 1}}'`.
///
/// # Errors
/// Returns `SqlKeywordError::ParameterError` for unbalanced braces, unknown or out-of-range
/// fields, unsupported field syntax, or mixing automatic and manual numbering.
pub fn render_template<'a>(
    template: &'a str,
    positional: &[String],
    named: &BTreeMap<String, String>,
) -> Result<Cow<'a, str>, SqlKeywordError> {
    if !template.contains(['{', '}']) {
        return Ok(Cow::Borrowed(template));
    }

    let mut out = String::with_capacity(template.len() + 16);
    let mut numbering = Numbering::Unset;
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' if chars.peek().map(|&(_, n)| n) == Some('{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut field = String::new();
                let mut closed = false;
                for (_, n) in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    field.push(n);
                }
                if !closed {
                    return Err(SqlKeywordError::ParameterError(format!(
                        "single '{{' encountered in query template at offset {pos}"
                    )));
                }
                out.push_str(resolve_field(&field, &mut numbering, positional, named)?);
            }
            '}' if chars.peek().map(|&(_, n)| n) == Some('}') => {
                chars.next();
                out.push('}');
            }
            '}' => {
                return Err(SqlKeywordError::ParameterError(format!(
                    "single '}}' encountered in query template at offset {pos}"
                )));
            }
            _ => out.push(c),
        }
    }

    Ok(Cow::Owned(out))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Numbering {
    Unset,
    Automatic(usize),
    Manual,
}

fn resolve_field<'v>(
    field: &str,
    numbering: &mut Numbering,
    positional: &'v [String],
    named: &'v BTreeMap<String, String>,
) -> Result<&'v str, SqlKeywordError> {
    let field = field.trim();
    if field.is_empty() {
        let idx = match *numbering {
            Numbering::Unset => 0,
            Numbering::Automatic(next) => next,
            Numbering::Manual => {
                return Err(SqlKeywordError::ParameterError(
                    "cannot switch from manual field numbering to automatic".to_string(),
                ));
            }
        };
        *numbering = Numbering::Automatic(idx + 1);
        return positional_value(positional, idx);
    }

    if field.bytes().all(|b| b.is_ascii_digit()) {
        if matches!(numbering, Numbering::Automatic(_)) {
            return Err(SqlKeywordError::ParameterError(
                "cannot switch from automatic field numbering to manual".to_string(),
            ));
        }
        *numbering = Numbering::Manual;
        let idx = field.parse::<usize>().map_err(|e| {
            SqlKeywordError::ParameterError(format!("bad field index '{field}': {e}"))
        })?;
        return positional_value(positional, idx);
    }

    let is_identifier = field
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && field.chars().all(|c| c.is_alphanumeric() || c == '_');
    if !is_identifier {
        return Err(SqlKeywordError::ParameterError(format!(
            "unsupported replacement field '{{{field}}}'"
        )));
    }
    named
        .get(field)
        .map(String::as_str)
        .ok_or_else(|| SqlKeywordError::ParameterError(format!("missing named value '{field}'")))
}

fn positional_value(positional: &[String], idx: usize) -> Result<&str, SqlKeywordError> {
    positional.get(idx).map(String::as_str).ok_or_else(|| {
        SqlKeywordError::ParameterError(format!(
            "replacement index {idx} out of range for {} positional value(s)",
            positional.len()
        ))
    })
}
