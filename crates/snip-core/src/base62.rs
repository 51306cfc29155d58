//! Base62 conversion between record identifiers and short codes.
//!
//! The alphabet is `0-9`, then `a-z`, then `A-Z`, so a digit's value is its
//! position in [`ALPHABET`].

use crate::error::{CoreError, Result};

/// The 62 symbols, ordered by digit value.
pub const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Numeric base of the codec.
pub const BASE: u64 = 62;

/// Encodes an identifier as a base62 string.
///
/// Zero encodes to `"0"` rather than an empty string.
///
/// # Examples
///
/// ```
/// use snip_core::base62;
///
/// assert_eq!(base62::encode(125), "21");
/// assert_eq!(base62::encode(0), "0");
/// ```
pub fn encode(mut id: u64) -> String {
    if id == 0 {
        return (ALPHABET[0] as char).to_string();
    }

    let mut digits = Vec::with_capacity(11);
    while id > 0 {
        digits.push(ALPHABET[(id % BASE) as usize]);
        id /= BASE;
    }
    digits.reverse();

    digits.into_iter().map(char::from).collect()
}

/// Decodes a base62 string back into the identifier it was encoded from.
pub fn decode(code: &str) -> Result<u64> {
    if code.is_empty() {
        return Err(CoreError::EmptyInput);
    }

    code.chars()
        .enumerate()
        .try_fold(0_u64, |acc, (position, character)| {
            let value = digit(character).ok_or(CoreError::InvalidCharacter {
                character,
                position,
            })?;
            acc.checked_mul(BASE)
                .and_then(|acc| acc.checked_add(u64::from(value)))
                .ok_or_else(|| CoreError::Overflow(code.to_string()))
        })
}

/// Returns true if every character of `code` belongs to the alphabet.
pub fn is_valid(code: &str) -> bool {
    !code.is_empty() && code.chars().all(|c| digit(c).is_some())
}

/// Returns the digit value of a base62 symbol.
pub fn digit(c: char) -> Option<u8> {
    match c {
        '0'..='9' => Some(c as u8 - b'0'),
        'a'..='z' => Some(c as u8 - b'a' + 10),
        'A'..='Z' => Some(c as u8 - b'A' + 36),
        _ => None,
    }
}

/// Returns the symbol for a digit value in `0..62`.
pub fn symbol(value: u8) -> Option<char> {
    ALPHABET.get(value as usize).map(|&b| b as char)
}
