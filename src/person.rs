//! Header lines shared by revision and release serialization.

/// Timezone written when the caller supplies none.
pub const DEFAULT_TIMEZONE: &str = "+0000";

/// Turn embedded newlines into git continuation lines (`"\n "`).
pub fn escape_newlines(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for &b in value {
        out.push(b);
        if b == b'\n' {
            out.push(b' ');
        }
    }
    out
}

/// `<role> <person> <timestamp> <timezone>`
pub fn format_person_line(
    role: &str,
    person: &[u8],
    timestamp: i64,
    timezone: Option<&str>,
) -> Vec<u8> {
    let mut line = format!("{} ", role).into_bytes();
    line.extend_from_slice(&escape_newlines(person));
    line.extend_from_slice(
        format!(" {} {}", timestamp, timezone.unwrap_or(DEFAULT_TIMEZONE)).as_bytes(),
    );
    line
}

/// `<key> <value>`, with the value newline-escaped.
pub fn format_header_line(key: &[u8], value: &[u8]) -> Vec<u8> {
    let mut line = key.to_vec();
    line.push(b' ');
    line.extend_from_slice(&escape_newlines(value));
    line
}

/// Join header lines, then append `"\n" + message` when a message is present.
///
/// `Some(b"")` and `None` serialize differently.
pub fn finish_body(lines: Vec<Vec<u8>>, message: Option<&[u8]>) -> Vec<u8> {
    let mut body = lines.join(&b'\n');
    body.push(b'\n');
    if let Some(message) = message {
        body.push(b'\n');
        body.extend_from_slice(message);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_newlines() {
        assert_eq!(escape_newlines(b"a\nb\n"), b"a\n b\n ".to_vec());
        assert_eq!(escape_newlines(b"plain"), b"plain".to_vec());
    }

    #[test]
    fn test_person_line_default_timezone() {
        let line = format_person_line("author", b"A <a@example.com>", 1234567890, None);
        assert_eq!(line, b"author A <a@example.com> 1234567890 +0000".to_vec());
    }

    #[test]
    fn test_person_line_negative_timestamp() {
        let line = format_person_line("tagger", b"A <a@b>", -5, Some("-0700"));
        assert_eq!(line, b"tagger A <a@b> -5 -0700".to_vec());
    }

    #[test]
    fn test_body_message_states() {
        let lines = vec![b"tree x".to_vec()];
        assert_eq!(finish_body(lines.clone(), None), b"tree x\n".to_vec());
        assert_eq!(finish_body(lines.clone(), Some(b"")), b"tree x\n\n".to_vec());
        assert_eq!(finish_body(lines, Some(b"msg\n")), b"tree x\n\nmsg\n".to_vec());
    }
}
