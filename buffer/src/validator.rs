use ilp_common::{CResult, Error};

/// Which identifier rules apply: table names are slightly more permissive
/// (a single interior `.` and `-` are allowed) than column/tag names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Table,
    Column,
}

const FORBIDDEN_PUNCTUATION: &[char] =
    &['?', ',', '\'', '"', '\\', '/', ':', '(', ')', '+', '*', '%', '~'];

/// Validates a table or column name against the server's file-name rules
/// (spec.md §4.1). Pure, stateless.
pub fn validate(kind: NameKind, name: &str, max_len: usize) -> CResult<()> {
    if name.is_empty() {
        return Err(Error::validation("identifier must not be empty"));
    }

    let len = name.chars().count();
    if len > max_len {
        return Err(Error::validation(format!(
            "identifier '{name}' is {len} characters, exceeds max_name_len={max_len}"
        )));
    }

    for c in name.chars() {
        if FORBIDDEN_PUNCTUATION.contains(&c) {
            return Err(Error::validation(format!(
                "identifier '{name}' contains forbidden character '{c}'"
            )));
        }
        if is_forbidden_control(c) {
            return Err(Error::validation(format!(
                "identifier '{name}' contains a forbidden control character (U+{:04X})",
                c as u32
            )));
        }
        match kind {
            NameKind::Column if c == '.' || c == '-' => {
                return Err(Error::validation(format!(
                    "column identifier '{name}' must not contain '.' or '-'"
                )));
            }
            _ => {}
        }
    }

    if kind == NameKind::Table {
        if name.starts_with('.') || name.ends_with('.') {
            return Err(Error::validation(format!(
                "table identifier '{name}' must not start or end with '.'"
            )));
        }
        if name.contains("..") {
            return Err(Error::validation(format!(
                "table identifier '{name}' must not contain '..'"
            )));
        }
    }

    Ok(())
}

fn is_forbidden_control(c: char) -> bool {
    let code = c as u32;
    (0x00..=0x09).contains(&code)
        || (0x0B..=0x0F).contains(&code)
        || code == 0x7F
        || code == 0xFEFF
        || c == '\n'
        || c == '\r'
}
