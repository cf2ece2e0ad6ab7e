/*!
 * Item Predicates
 * Pure, deterministic checks evaluated by a worker over its item text
 */

/// Predicate signature a worker evaluates over its item
pub type Predicate = fn(&str) -> bool;

/// True when the text reads the same forwards and backwards, byte for byte.
///
/// Walks inward from both ends and stops at the first mismatch. Empty and
/// single-byte inputs are symmetric.
pub fn is_symmetric(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() < 2 {
        return true;
    }

    let (mut front, mut back) = (0, bytes.len() - 1);
    while front < back {
        if bytes[front] != bytes[back] {
            return false;
        }
        front += 1;
        back -= 1;
    }
    true
}
