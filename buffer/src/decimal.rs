use ilp_common::{CResult, Error};

/// Validates the textual decimal representation used by
/// `Buffer::decimal_column_text`: an optional sign, digits, and at most
/// one `.` (spec.md §4.2.2).
pub fn validate_decimal_text(value: &str) -> CResult<()> {
    let mut chars = value.chars().peekable();
    let mut saw_dot = false;
    let mut saw_digit = false;

    if matches!(chars.peek(), Some('+') | Some('-')) {
        chars.next();
    }

    for c in chars {
        match c {
            '0'..='9' => saw_digit = true,
            '.' if !saw_dot => saw_dot = true,
            _ => {
                return Err(Error::validation(format!(
                    "'{value}' is not a valid decimal literal"
                )))
            }
        }
    }

    if !saw_digit {
        return Err(Error::validation(format!("'{value}' is not a valid decimal literal")));
    }

    Ok(())
}

/// Validates the binary decimal parameters: `scale` in `[0, 76]` and
/// `unscaled` (a two's-complement big-endian encoding, zero length means
/// NULL) in `[0, 32]` bytes.
pub fn validate_decimal_binary(unscaled: &[u8], scale: u8) -> CResult<()> {
    if scale > 76 {
        return Err(Error::validation(format!("decimal scale {scale} exceeds the maximum of 76")));
    }
    if unscaled.len() > 32 {
        return Err(Error::validation(format!(
            "decimal unscaled value is {} bytes, exceeds the maximum of 32",
            unscaled.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_integer() {
        assert!(validate_decimal_text("123").is_ok());
    }

    #[test]
    fn accepts_signed_decimal() {
        assert!(validate_decimal_text("-12.34").is_ok());
        assert!(validate_decimal_text("+12.34").is_ok());
    }

    #[test]
    fn rejects_two_dots() {
        assert!(validate_decimal_text("1.2.3").is_err());
    }

    #[test]
    fn rejects_no_digits() {
        assert!(validate_decimal_text("-").is_err());
        assert!(validate_decimal_text(".").is_err());
    }

    #[test]
    fn rejects_scale_out_of_range() {
        assert!(validate_decimal_binary(&[1], 77).is_err());
        assert!(validate_decimal_binary(&[1], 76).is_ok());
    }

    #[test]
    fn rejects_unscaled_too_long() {
        let bytes = vec![0u8; 33];
        assert!(validate_decimal_binary(&bytes, 0).is_err());
        assert!(validate_decimal_binary(&bytes[..32], 0).is_ok());
    }

    #[test]
    fn zero_length_unscaled_encodes_null() {
        assert!(validate_decimal_binary(&[], 5).is_ok());
    }
}
