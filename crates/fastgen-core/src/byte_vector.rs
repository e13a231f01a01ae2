use crate::error::{GenError, Result};

/// Decode a hex byte-vector literal. Spaces, tabs, CR and LF are ignored.
pub fn decode_hex_literal(literal: &str) -> Result<Vec<u8>> {
    let digits: Vec<u8> = literal
        .bytes()
        .filter(|b| !matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
        .collect();

    if let Some(&bad) = digits.iter().find(|b| !b.is_ascii_hexdigit()) {
        let ch = if bad.is_ascii() {
            bad as char
        } else {
            // Report the whole (non-ASCII) character rather than one of its bytes.
            literal
                .chars()
                .find(|c| !c.is_ascii())
                .unwrap_or(char::REPLACEMENT_CHARACTER)
        };
        return Err(GenError::InvalidByteVectorChar {
            literal: literal.to_string(),
            ch,
        });
    }
    if digits.len() % 2 != 0 {
        return Err(GenError::OddByteVector {
            literal: literal.to_string(),
        });
    }

    // Digits are checked above, so the decoder only sees well-formed pairs.
    hex::decode(&digits)
        .map_err(|e| GenError::Internal(format!("hex decode of {literal:?}: {e}")))
}

/// C string-literal body with one `\xHH` escape per byte.
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 4);
    for b in bytes {
        out.push_str(&format!("\\x{:02X}", b));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_pairs() {
        assert_eq!(decode_hex_literal("0A1B").expect("valid"), vec![0x0A, 0x1B]);
        assert_eq!(decode_hex_literal("ff00").expect("valid"), vec![0xFF, 0x00]);
        assert!(decode_hex_literal("").expect("empty is valid").is_empty());
    }

    #[test]
    fn digits_are_case_insensitive() {
        assert_eq!(
            decode_hex_literal("0a1B fF").expect("valid"),
            vec![0x0A, 0x1B, 0xFF]
        );
    }

    #[test]
    fn whitespace_is_stripped_first() {
        assert_eq!(
            decode_hex_literal(" 0A 1B ").expect("valid"),
            decode_hex_literal("0A1B").expect("valid")
        );
        assert_eq!(
            decode_hex_literal("0\tA\r\n1B").expect("valid"),
            vec![0x0A, 0x1B]
        );
    }

    #[test]
    fn odd_length_fails() {
        let err = decode_hex_literal("0A1").expect_err("odd");
        assert!(matches!(err, GenError::OddByteVector { .. }));
        assert!(err.to_string().contains("even digits"), "{err}");
    }

    #[test]
    fn invalid_digit_is_reported() {
        let err = decode_hex_literal("0G").expect_err("bad digit");
        match err {
            GenError::InvalidByteVectorChar { literal, ch } => {
                assert_eq!(literal, "0G");
                assert_eq!(ch, 'G');
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_digit_wins_over_odd_length() {
        let err = decode_hex_literal("0Az").expect_err("bad digit");
        assert!(matches!(err, GenError::InvalidByteVectorChar { ch: 'z', .. }));
    }

    #[test]
    fn escapes_each_byte() {
        assert_eq!(escape_bytes(&[0x0A, 0x1B]), "\\x0A\\x1B");
    }
}
