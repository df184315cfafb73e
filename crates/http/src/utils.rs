//! Small helpers shared by the codec and header parsing code.

/// Returns early with an error if a condition is not met.
///
/// Like `assert!`, but for validation paths that must report a [`Result`]
/// instead of panicking.
///
/// ```ignore
/// ensure!(headers.len() <= config.max_headers(), ParseError::too_many_headers(config.max_headers()));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;

/// Splits `raw` on `delimiter`, ignoring delimiters inside double quoted strings.
///
/// A backslash inside a quoted string escapes the next byte. Segments are returned
/// untrimmed.
pub(crate) fn split_unquoted(raw: &str, delimiter: u8) -> Vec<&str> {
    let bytes = raw.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_quotes => escaped = true,
            b'"' => in_quotes = !in_quotes,
            b if b == delimiter && !in_quotes => {
                segments.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&raw[start..]);
    segments
}

/// Returns true if a comma separated header value contains `token`, ignoring ASCII case.
pub(crate) fn contains_token(value: &[u8], token: &str) -> bool {
    value.split(|b| *b == b',').any(|item| item.trim_ascii().eq_ignore_ascii_case(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_respects_quotes() {
        assert_eq!(split_unquoted("a=1; b=2", b';'), vec!["a=1", " b=2"]);
        assert_eq!(split_unquoted(r#"a="x;y"; b=2"#, b';'), vec![r#"a="x;y""#, " b=2"]);
        assert_eq!(split_unquoted(r#"a="x\";y";b"#, b';'), vec![r#"a="x\";y""#, "b"]);
        assert_eq!(split_unquoted("", b';'), vec![""]);
    }

    #[test]
    fn token_lookup() {
        assert!(contains_token(b"keep-alive, Upgrade", "upgrade"));
        assert!(!contains_token(b"keep-alive", "upgrade"));
        assert!(!contains_token(b"upgraded", "upgrade"));
    }
}
