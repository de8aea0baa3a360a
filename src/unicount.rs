//! Conversions between codepoint offsets and byte offsets in utf-8 strings.
//!
//! Every position and length in an [`Operation`](crate::Operation) counts unicode scalar values,
//! not bytes, because that's what the editors on either end agree on. Rust strings are indexed by
//! byte, so we go through str_indices whenever we slice.

pub fn chars_to_bytes(s: &str, char_pos: usize) -> usize {
    str_indices::chars::to_byte_idx(s, char_pos)
}

/// Returns the chars in `s` in the range `start..end` (char offsets). Clamps to the end of the
/// string.
pub fn char_slice(s: &str, start: usize, end: usize) -> &str {
    let start_byte = chars_to_bytes(s, start);
    let end_byte = chars_to_bytes(s, end.max(start));
    &s[start_byte..end_byte]
}

#[inline]
pub fn count_chars(s: &str) -> usize {
    str_indices::chars::count(s)
}
