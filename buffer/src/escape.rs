/// Escapes a table/column/symbol identifier or an unquoted symbol value:
/// space, comma and `=` get a backslash, `\n`/`\r` get a backslash, and any
/// literal backslash is doubled (spec.md §4.2).
pub fn escape_unquoted(s: &str, out: &mut Vec<u8>) {
    for c in s.chars() {
        match c {
            ' ' | ',' | '=' => {
                out.push(b'\\');
                push_char(c, out);
            }
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\\' => out.extend_from_slice(b"\\\\"),
            other => push_char(other, out),
        }
    }
}

/// Escapes the contents of a quoted string column: `"` gets a backslash,
/// `\n`/`\r` get a backslash, a literal backslash is doubled, but space,
/// comma and `=` are left alone (spec.md §4.2).
pub fn escape_quoted(s: &str, out: &mut Vec<u8>) {
    out.push(b'"');
    for c in s.chars() {
        match c {
            '"' => out.extend_from_slice(b"\\\""),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\\' => out.extend_from_slice(b"\\\\"),
            other => push_char(other, out),
        }
    }
    out.push(b'"');
}

fn push_char(c: char, out: &mut Vec<u8>) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}
