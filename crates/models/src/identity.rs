//! Stable numeric identifiers derived from text.
//!
//! Users have no stored id: their id is the 31-multiplier string hash of their
//! email, computed over UTF-16 code units in wrapping 32-bit arithmetic and
//! returned as an absolute value. Collisions are not handled.

/// Identifier type shared by users and reviews.
pub type RecordId = i64;

/// Hash `text` into a non-negative id. Same input, same output.
pub fn derive_id(text: &str) -> RecordId {
    let acc = text
        .encode_utf16()
        .fold(0i32, |acc, unit| acc.wrapping_mul(31).wrapping_add(i32::from(unit)));
    RecordId::from(acc.unsigned_abs())
}
