use nanoid::nanoid;

/// Canonical alphabet for generated document identifiers (no ambiguous glyphs).
const DOCUMENT_ID_ALPHABET: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y',
    'Z', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
/// Default document id length.
const DOCUMENT_ID_LENGTH: usize = 20;

/// Generates a new document identifier for `add` writes.
pub fn generate_document_id() -> String {
    nanoid!(DOCUMENT_ID_LENGTH, DOCUMENT_ID_ALPHABET)
}

/// Id of the single record holding one value per natural key, e.g. `(userId, role)`.
pub fn composite_id(parts: &[&str]) -> String {
    parts.join("_")
}

/// Order-independent id for an undirected pair.
pub fn pair_id(a: &str, b: &str) -> String {
    if a <= b {
        composite_id(&[a, b])
    } else {
        composite_id(&[b, a])
    }
}
