//! Decoding of compressed asset UUIDs.
//!
//! Asset manifests store UUIDs in a 22-character packed form: the first two
//! characters are kept verbatim and the remaining 20 base64 symbols carry the
//! other 30 hex nibbles, three nibbles per symbol pair. An optional `@suffix`
//! (sub-asset reference) follows the identifier and is preserved as-is.
//!
//! # Example
//!
//! ```
//! use uuid2asset_core::decode_uuid;
//!
//! assert_eq!(
//!     decode_uuid("AAAAAAAAAAAAAAAAAAAAAA"),
//!     "AA000000-0000-0000-0000-000000000000"
//! );
//! // Short identifiers are already plain and pass through untouched.
//! assert_eq!(decode_uuid("0a1b2c3d4"), "0a1b2c3d4");
//! ```

/// Length of a packed identifier.
const PACKED_LEN: usize = 22;

/// Length of the canonical hyphenated form.
const CANONICAL_LEN: usize = 36;

/// Character offsets of the hyphens in the canonical form.
const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];

/// Value assigned to characters outside the base64 alphabet.
const INVALID_SYMBOL: u8 = 64;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Maps a base64 symbol to its 6-bit value, or [`INVALID_SYMBOL`].
fn symbol_value(c: char) -> u8 {
    match c {
        'A'..='Z' => c as u8 - b'A',
        'a'..='z' => c as u8 - b'a' + 26,
        '0'..='9' => c as u8 - b'0' + 52,
        '+' => 62,
        '/' => 63,
        _ => INVALID_SYMBOL,
    }
}

fn hex_digit(nibble: u8) -> char {
    char::from(HEX_DIGITS[usize::from(nibble & 0xF)])
}

/// Decodes a packed asset UUID into its canonical hyphenated form.
///
/// Identifiers whose length (before any `@`) is not exactly 22 characters are
/// returned unchanged, as are 9-character short ids. The `@suffix`, if any, is
/// re-attached verbatim to the decoded identifier.
#[must_use]
pub fn decode_uuid(encoded: &str) -> String {
    let (id, suffix) = match encoded.split_once('@') {
        Some((id, rest)) => (id, Some(rest)),
        None => (encoded, None),
    };

    let chars: Vec<char> = id.chars().collect();
    if chars.len() != PACKED_LEN {
        return encoded.to_string();
    }

    let mut digits = Vec::with_capacity(32);
    digits.push(chars[0]);
    digits.push(chars[1]);
    for pair in chars[2..].chunks_exact(2) {
        let lhs = symbol_value(pair[0]);
        let rhs = symbol_value(pair[1]);
        digits.push(hex_digit(lhs >> 2));
        digits.push(hex_digit(((lhs & 3) << 2) | (rhs >> 4)));
        digits.push(hex_digit(rhs & 0xF));
    }

    let mut decoded = String::with_capacity(CANONICAL_LEN + suffix.map_or(0, |s| s.len() + 1));
    let mut digits = digits.into_iter();
    for position in 0..CANONICAL_LEN {
        if HYPHEN_POSITIONS.contains(&position) {
            decoded.push('-');
        } else if let Some(digit) = digits.next() {
            decoded.push(digit);
        }
    }

    if let Some(suffix) = suffix {
        decoded.push('@');
        decoded.push_str(suffix);
    }
    decoded
}
