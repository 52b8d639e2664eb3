pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// Bytes that continue an unquoted word. Non-ASCII bytes count so multi-byte
/// identifiers are never split mid-character.
pub(super) fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Recognize `$tag$` (or `$$`) at `start`; returns the tag and the index of the closing `$`.
pub(super) fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    if bytes.get(idx).is_some_and(u8::is_ascii_digit) {
        // `$1` is a placeholder, not a tag
        return None;
    }
    while idx < bytes.len() && bytes[idx] != b'$' {
        let b = bytes[idx];
        if !(b.is_ascii_alphanumeric() || b == b'_') {
            return None;
        }
        idx += 1;
    }

    if idx < bytes.len() && bytes[idx] == b'$' {
        let tag = String::from_utf8(bytes[start + 1..idx].to_vec()).ok()?;
        Some((tag, idx))
    } else {
        None
    }
}

/// Index just past the `$tag$` that closes a dollar-quoted body, or the end of input with
/// `false` when the body is never closed.
pub(super) fn dollar_quote_end(bytes: &[u8], from: usize, tag: &str) -> (usize, bool) {
    let closing = format!("${tag}$");
    let closing = closing.as_bytes();
    let mut idx = from;
    while idx + closing.len() <= bytes.len() {
        if &bytes[idx..idx + closing.len()] == closing {
            return (idx + closing.len(), true);
        }
        idx += 1;
    }
    (bytes.len(), false)
}
