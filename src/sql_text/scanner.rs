use crate::types::DatabaseType;

use super::parsers::{
    dollar_quote_end, is_block_comment_end, is_block_comment_start, is_line_comment_start,
    is_word_byte, try_start_dollar_quote,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TokenKind {
    Word,
    /// String literal, quoted identifier or dollar-quoted body
    Quoted,
    LineComment,
    BlockComment,
    Whitespace,
    Terminator,
    OpenParen,
    CloseParen,
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Token<'a> {
    pub(super) kind: TokenKind,
    pub(super) text: &'a str,
    /// False when a comment or literal runs off the end of the input
    pub(super) closed: bool,
}

/// Split SQL into tokens. Concatenating every token's text reproduces the input exactly.
pub(super) fn tokenize(sql: &str, dialect: DatabaseType) -> Vec<Token<'_>> {
    let bytes = sql.as_bytes();
    let mut tokens = Vec::new();
    let mut idx = 0;

    while idx < bytes.len() {
        let start = idx;
        let b = bytes[idx];
        let mut closed = true;
        let kind = if b.is_ascii_whitespace() {
            while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
                idx += 1;
            }
            TokenKind::Whitespace
        } else if is_line_comment_start(bytes, idx)
            || (b == b'#' && dialect == DatabaseType::Mysql)
        {
            idx = line_end(bytes, idx);
            TokenKind::LineComment
        } else if is_block_comment_start(bytes, idx) {
            (idx, closed) = block_comment_end(bytes, idx);
            TokenKind::BlockComment
        } else if b == b'\'' {
            let escapes = dialect == DatabaseType::Mysql || has_escape_prefix(bytes, idx);
            (idx, closed) = quoted_end(bytes, idx, b'\'', escapes);
            TokenKind::Quoted
        } else if b == b'"' || (b == b'`' && dialect == DatabaseType::Mysql) {
            (idx, closed) = quoted_end(bytes, idx, b, false);
            TokenKind::Quoted
        } else if b == b'$' {
            if let Some((tag, opener_end)) = try_start_dollar_quote(bytes, idx) {
                (idx, closed) = dollar_quote_end(bytes, opener_end + 1, &tag);
                TokenKind::Quoted
            } else {
                idx = word_end(bytes, idx + 1);
                TokenKind::Word
            }
        } else if b == b';' {
            idx += 1;
            TokenKind::Terminator
        } else if b == b'(' {
            idx += 1;
            TokenKind::OpenParen
        } else if b == b')' {
            idx += 1;
            TokenKind::CloseParen
        } else if is_word_byte(b) {
            idx = word_end(bytes, idx);
            TokenKind::Word
        } else {
            idx += 1;
            TokenKind::Punct
        };
        tokens.push(Token {
            kind,
            text: &sql[start..idx],
            closed,
        });
    }

    tokens
}

fn word_end(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() && is_word_byte(bytes[idx]) {
        idx += 1;
    }
    idx
}

fn line_end(bytes: &[u8], idx: usize) -> usize {
    bytes[idx..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |pos| idx + pos)
}

fn block_comment_end(bytes: &[u8], start: usize) -> (usize, bool) {
    let mut depth = 1u32;
    let mut idx = start + 2;
    while idx < bytes.len() {
        if is_block_comment_start(bytes, idx) {
            depth += 1;
            idx += 2;
        } else if is_block_comment_end(bytes, idx) {
            depth -= 1;
            idx += 2;
            if depth == 0 {
                return (idx, true);
            }
        } else {
            idx += 1;
        }
    }
    (bytes.len(), false)
}

fn quoted_end(bytes: &[u8], start: usize, quote: u8, backslash_escapes: bool) -> (usize, bool) {
    let mut idx = start + 1;
    while idx < bytes.len() {
        let b = bytes[idx];
        if backslash_escapes && b == b'\\' {
            idx += 2;
            continue;
        }
        if b == quote {
            if bytes.get(idx + 1) == Some(&quote) {
                idx += 2; // escaped quote
                continue;
            }
            return (idx + 1, true);
        }
        idx += 1;
    }
    (bytes.len(), false)
}

/// `E'...'` strings accept backslash escapes.
fn has_escape_prefix(bytes: &[u8], quote_idx: usize) -> bool {
    quote_idx > 0
        && matches!(bytes[quote_idx - 1], b'E' | b'e')
        && (quote_idx < 2 || !is_word_byte(bytes[quote_idx - 2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(sql: &str) -> Vec<TokenKind> {
        tokenize(sql, DatabaseType::Other)
            .into_iter()
            .filter(|t| t.kind != TokenKind::Whitespace)
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokens_reassemble_input() {
        let sql = "select 'a;b', \"c\" -- x;\n/* y; /* nested */ */ from t; $f$ ; $f$ $1";
        let joined: String = tokenize(sql, DatabaseType::Other)
            .iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(joined, sql);
    }

    #[test]
    fn literals_hide_terminators() {
        assert_eq!(
            kinds("select 'a;''b' ;"),
            vec![TokenKind::Word, TokenKind::Quoted, TokenKind::Terminator]
        );
        assert_eq!(
            kinds("$body$ x; $body$;"),
            vec![TokenKind::Quoted, TokenKind::Terminator]
        );
        assert_eq!(
            kinds("E'it\\'s;';"),
            vec![TokenKind::Word, TokenKind::Quoted, TokenKind::Terminator]
        );
    }

    #[test]
    fn placeholders_are_words() {
        assert_eq!(
            kinds("$1, $2"),
            vec![TokenKind::Word, TokenKind::Punct, TokenKind::Word]
        );
    }

    #[test]
    fn unclosed_comment_and_literal_are_flagged() {
        fn ends_closed(sql: &str) -> bool {
            tokenize(sql, DatabaseType::Other)
                .last()
                .is_some_and(|t| t.closed)
        }
        assert!(!ends_closed("select 1 /* open ; select 2;"));
        assert!(!ends_closed("select 'open; select 2;"));
        assert!(!ends_closed("do $f$ begin; select 2;"));
        assert!(
            tokenize("select '' /* a */ $$x$$", DatabaseType::Other)
                .iter()
                .all(|t| t.closed)
        );
    }

    #[test]
    fn mysql_hash_comment_and_backticks() {
        let toks: Vec<_> = tokenize("# c;\n`a;b`;", DatabaseType::Mysql)
            .into_iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            toks,
            vec![
                TokenKind::LineComment,
                TokenKind::Whitespace,
                TokenKind::Quoted,
                TokenKind::Terminator
            ]
        );
    }
}
