//! Positional text operations.
//!
//! An [`Operation`] is a single edit to a plain text document: an insert, a delete, a sequential
//! pair of edits ([`Operation::Split`]) or nothing at all. Positions are counted in unicode
//! codepoints. Deletes carry the text they remove so they can be inverted and so we can check
//! them against replicas in tests.

mod editablestring;
mod inclusion;

use std::fmt::{Display, Formatter};
use smallvec::SmallVec;
use smartstring::alias::String as SmartString;
use crate::unicount::{char_slice, count_chars};

pub use editablestring::EditableText;
pub use inclusion::transform;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Operation {
    Insert { pos: usize, content: SmartString },
    Delete { pos: usize, content: SmartString },
    /// Apply the first operation, then the second. The second operation's positions refer to the
    /// document after the first has been applied.
    Split(Box<Operation>, Box<Operation>),
    /// Does nothing. Still gets a timestamp when it is sent, so it can be used to acknowledge
    /// remote operations.
    #[default]
    NoOperation,
}

use Operation::*;

/// A flattened, editor-level view of an operation: replace `replaced_text` at `offset` with
/// `new_text`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TextEdit {
    pub offset: usize,
    pub replaced_text: SmartString,
    pub new_text: SmartString,
}

impl Operation {
    pub fn new_insert(pos: usize, content: &str) -> Self {
        Insert { pos, content: content.into() }
    }

    pub fn new_delete(pos: usize, content: &str) -> Self {
        Delete { pos, content: content.into() }
    }

    pub fn new_split(first: Operation, second: Operation) -> Self {
        Split(Box::new(first), Box::new(second))
    }

    /// Build the operation an editor replace event corresponds to. Replacements are modelled as a
    /// delete followed by an insert at the same position.
    pub fn from_replace(offset: usize, replaced_text: &str, new_text: &str) -> Self {
        match (replaced_text.is_empty(), new_text.is_empty()) {
            (true, true) => NoOperation,
            (false, true) => Self::new_delete(offset, replaced_text),
            (true, false) => Self::new_insert(offset, new_text),
            (false, false) => Self::new_split(
                Self::new_delete(offset, replaced_text),
                Self::new_insert(offset, new_text),
            ),
        }
    }

    /// Number of characters this component inserts or removes. Zero for splits and no-ops.
    pub(crate) fn content_len(&self) -> usize {
        match self {
            Insert { content, .. } | Delete { content, .. } => count_chars(content),
            Split(..) | NoOperation => 0,
        }
    }

    /// True if applying this operation never changes a document.
    pub fn is_noop(&self) -> bool {
        match self {
            Insert { content, .. } | Delete { content, .. } => content.is_empty(),
            Split(a, b) => a.is_noop() && b.is_noop(),
            NoOperation => true,
        }
    }

    /// Net change in document length (in chars) from applying this operation.
    pub fn len_delta(&self) -> isize {
        match self {
            Insert { .. } => self.content_len() as isize,
            Delete { .. } => -(self.content_len() as isize),
            Split(a, b) => a.len_delta() + b.len_delta(),
            NoOperation => 0,
        }
    }

    pub fn apply<D: EditableText + ?Sized>(&self, doc: &mut D) {
        match self {
            Insert { pos, content } => doc.insert_at(*pos, content),
            Delete { pos, .. } => doc.remove_at(*pos, self.content_len()),
            Split(a, b) => {
                a.apply(doc);
                b.apply(doc);
            }
            NoOperation => {}
        }
    }

    pub fn apply_to_string(&self, val: &str) -> String {
        let mut result = val.to_string();
        self.apply(&mut result);
        result
    }

    /// Produce the operation which undoes this one.
    pub fn invert(&self) -> Operation {
        match self {
            Insert { pos, content } => Delete { pos: *pos, content: content.clone() },
            Delete { pos, content } => Insert { pos: *pos, content: content.clone() },
            Split(a, b) => Self::new_split(b.invert(), a.invert()),
            NoOperation => NoOperation,
        }
    }

    /// Merge `next`, an operation by the same author applied directly after `self`, into a
    /// single operation. Runs of typing, forward deletes and backspaces collapse into one insert or
    /// delete. Typing then erasing some of the same text collapses into what's left. Erasing all
    /// of it stays a split, so the pair is still transformed against concurrent operations.
    /// Anything else becomes a split.
    pub fn compose(self, next: Operation) -> Operation {
        match (self, next) {
            (NoOperation, op) | (op, NoOperation) => op,

            (Insert { pos: p1, content: c1 }, Insert { pos: p2, content: c2 })
                if p2 >= p1 && p2 <= p1 + count_chars(&c1) =>
            {
                let offset = p2 - p1;
                let mut content = SmartString::from(char_slice(&c1, 0, offset));
                content.push_str(&c2);
                content.push_str(char_slice(&c1, offset, usize::MAX));
                Insert { pos: p1, content }
            }

            // Forward delete.
            (Delete { pos: p1, content: mut c1 }, Delete { pos: p2, content: c2 }) if p1 == p2 => {
                c1.push_str(&c2);
                Delete { pos: p1, content: c1 }
            }

            // Backspace.
            (Delete { pos: p1, content: c1 }, Delete { pos: p2, content: mut c2 })
                if p2 + count_chars(&c2) == p1 =>
            {
                c2.push_str(&c1);
                Delete { pos: p2, content: c2 }
            }

            // Deleting some of the text we just typed.
            (Insert { pos: p1, content: c1 }, Delete { pos: p2, content: c2 })
                if p2 >= p1 && p2 + count_chars(&c2) <= p1 + count_chars(&c1) =>
            {
                let start = p2 - p1;
                let end = start + count_chars(&c2);
                let mut content = SmartString::from(char_slice(&c1, 0, start));
                content.push_str(char_slice(&c1, end, usize::MAX));
                if content.is_empty() {
                    Self::new_split(Insert { pos: p1, content: c1 }, Delete { pos: p2, content: c2 })
                } else {
                    Insert { pos: p1, content }
                }
            }

            (a, b) => Self::new_split(a, b),
        }
    }

    /// Flatten this operation into the sequence of atomic inserts and deletes it performs.
    fn push_components<'a>(&'a self, into: &mut SmallVec<[&'a Operation; 2]>) {
        match self {
            Split(a, b) => {
                a.push_components(into);
                b.push_components(into);
            }
            NoOperation => {}
            op => into.push(op),
        }
    }

    /// Convert to editor-level text edits, in the order they have to be applied. A delete
    /// directly followed by an insert at the same offset becomes a single replace.
    pub fn text_edits(&self) -> SmallVec<[TextEdit; 1]> {
        let mut components = SmallVec::<[&Operation; 2]>::new();
        self.push_components(&mut components);

        let mut result = SmallVec::<[TextEdit; 1]>::new();
        for op in components {
            match op {
                Insert { pos, content } => {
                    if let Some(last) = result.last_mut() {
                        if last.new_text.is_empty() && last.offset == *pos {
                            last.new_text = content.clone();
                            continue;
                        }
                    }
                    result.push(TextEdit {
                        offset: *pos,
                        replaced_text: SmartString::new(),
                        new_text: content.clone(),
                    });
                }
                Delete { pos, content } => result.push(TextEdit {
                    offset: *pos,
                    replaced_text: content.clone(),
                    new_text: SmartString::new(),
                }),
                Split(..) | NoOperation => unreachable!(),
            }
        }
        result
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Insert { pos, content } => write!(f, "Insert({}, {:?})", pos, content),
            Delete { pos, content } => write!(f, "Delete({}, {:?})", pos, content),
            Split(a, b) => write!(f, "Split({}, {})", a, b),
            NoOperation => f.write_str("NoOperation"),
        }
    }
}
