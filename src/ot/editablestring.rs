use jumprope::JumpRope;
use crate::unicount::chars_to_bytes;

/// Anything an [`Operation`](crate::Operation) can be applied to. Positions are in unicode
/// codepoints.
pub trait EditableText {
    fn insert_at(&mut self, pos: usize, contents: &str);
    fn remove_at(&mut self, pos: usize, length: usize);
}

impl EditableText for String {
    fn insert_at(&mut self, char_pos: usize, contents: &str) {
        // Writing past the end of the string appends.
        let byte_pos = chars_to_bytes(self, char_pos);
        self.insert_str(byte_pos, contents);
    }

    fn remove_at(&mut self, pos: usize, length: usize) {
        let start = chars_to_bytes(self, pos);
        let end = start + chars_to_bytes(&self[start..], length);
        self.drain(start..end);
    }
}

impl EditableText for JumpRope {
    fn insert_at(&mut self, pos: usize, contents: &str) {
        let pos = pos.min(self.len_chars());
        self.insert(pos, contents);
    }

    fn remove_at(&mut self, pos: usize, length: usize) {
        let len = self.len_chars();
        let start = pos.min(len);
        let end = (pos + length).min(len);
        self.remove(start..end);
    }
}
