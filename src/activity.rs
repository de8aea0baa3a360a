//! The activities this crate consumes and produces.
//!
//! Activities are the units the session layer moves around: editor edits, the jupiter-stamped
//! operations derived from them, checksums and resource lifecycle notifications. Every activity
//! is tagged with the user it originated from and the document it's about. Parsing them off the
//! wire is someone else's job.

use std::fmt::{Display, Formatter};
use crc::{Crc, CRC_32_ISCSI};
use smartstring::alias::String as SmartString;
use crate::{Operation, ResourcePath, TextEdit, UserId, VectorTime};
use crate::unicount::count_chars;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const CHECKSUM: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

/// An edit made in an editor: `replaced_text` at `offset` was replaced with `new_text`.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TextEditActivity {
    pub source: UserId,
    pub path: ResourcePath,
    pub offset: usize,
    pub replaced_text: SmartString,
    pub new_text: SmartString,
}

impl TextEditActivity {
    pub fn new(source: UserId, path: ResourcePath, offset: usize, replaced_text: &str, new_text: &str) -> Self {
        Self {
            source,
            path,
            offset,
            replaced_text: replaced_text.into(),
            new_text: new_text.into(),
        }
    }

    pub fn insert(source: UserId, path: ResourcePath, offset: usize, text: &str) -> Self {
        Self::new(source, path, offset, "", text)
    }

    pub fn delete(source: UserId, path: ResourcePath, offset: usize, text: &str) -> Self {
        Self::new(source, path, offset, text, "")
    }

    pub fn from_edit(source: UserId, path: ResourcePath, edit: TextEdit) -> Self {
        Self {
            source,
            path,
            offset: edit.offset,
            replaced_text: edit.replaced_text,
            new_text: edit.new_text,
        }
    }

    pub fn to_operation(&self) -> Operation {
        Operation::from_replace(self.offset, &self.replaced_text, &self.new_text)
    }
}

/// An operation stamped by the sender's jupiter engine for one specific receiver.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JupiterActivity {
    /// The user who made the edit. On the host's fan-out this stays the original author, not the
    /// host.
    pub source: UserId,
    pub path: ResourcePath,
    pub timestamp: VectorTime,
    pub operation: Operation,
}

impl JupiterActivity {
    pub fn new(source: UserId, path: ResourcePath, timestamp: VectorTime, operation: Operation) -> Self {
        Self { source, path, timestamp, operation }
    }
}

/// Hash and length of a document's content.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DocumentChecksum {
    pub hash: u32,
    /// Length in chars.
    pub length: usize,
}

impl DocumentChecksum {
    pub fn of(content: &str) -> Self {
        Self {
            hash: CHECKSUM.checksum(content.as_bytes()),
            length: count_chars(content),
        }
    }
}

impl Display for DocumentChecksum {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:08x}/{}", self.hash, self.length)
    }
}

/// The host's checksum of a document, used by participants to detect silent divergence.
///
/// `checksum` is `None` when the document doesn't exist (anymore). That form doubles as the
/// confirmation that a deleted document is gone.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChecksumActivity {
    pub source: UserId,
    pub path: ResourcePath,
    pub checksum: Option<DocumentChecksum>,
    /// The jupiter timestamp the checksum was computed at, from the point of view of the sender.
    /// Unset until the activity goes through a jupiter engine.
    pub timestamp: Option<VectorTime>,
}

impl ChecksumActivity {
    pub fn new(source: UserId, path: ResourcePath, content: &str) -> Self {
        Self {
            source,
            path,
            checksum: Some(DocumentChecksum::of(content)),
            timestamp: None,
        }
    }

    pub fn missing(source: UserId, path: ResourcePath) -> Self {
        Self { source, path, checksum: None, timestamp: None }
    }

    pub fn is_missing(&self) -> bool {
        self.checksum.is_none()
    }

    #[must_use]
    pub fn with_timestamp(&self, timestamp: VectorTime) -> Self {
        Self { timestamp: Some(timestamp), ..self.clone() }
    }

    /// Does `content` match this checksum?
    pub fn matches(&self, content: Option<&str>) -> bool {
        self.checksum == content.map(DocumentChecksum::of)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FileActivityKind { Created, Removed }

#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FileActivity {
    pub source: UserId,
    pub path: ResourcePath,
    pub kind: FileActivityKind,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EditorActivityKind { Activated, Saved, Closed }

#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EditorActivity {
    pub source: UserId,
    pub path: ResourcePath,
    pub kind: EditorActivityKind,
}

/// Sent by a participant once it has processed the deletion of `path` locally.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeletionAcknowledgmentActivity {
    pub source: UserId,
    pub path: ResourcePath,
}

#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Activity {
    TextEdit(TextEditActivity),
    Jupiter(JupiterActivity),
    Checksum(ChecksumActivity),
    File(FileActivity),
    Editor(EditorActivity),
    DeletionAcknowledgment(DeletionAcknowledgmentActivity),
}

impl Activity {
    pub fn file(source: UserId, path: ResourcePath, kind: FileActivityKind) -> Self {
        Activity::File(FileActivity { source, path, kind })
    }

    pub fn editor(source: UserId, path: ResourcePath, kind: EditorActivityKind) -> Self {
        Activity::Editor(EditorActivity { source, path, kind })
    }

    pub fn deletion_acknowledgment(source: UserId, path: ResourcePath) -> Self {
        Activity::DeletionAcknowledgment(DeletionAcknowledgmentActivity { source, path })
    }

    pub fn source(&self) -> &UserId {
        match self {
            Activity::TextEdit(a) => &a.source,
            Activity::Jupiter(a) => &a.source,
            Activity::Checksum(a) => &a.source,
            Activity::File(a) => &a.source,
            Activity::Editor(a) => &a.source,
            Activity::DeletionAcknowledgment(a) => &a.source,
        }
    }

    pub fn path(&self) -> &ResourcePath {
        match self {
            Activity::TextEdit(a) => &a.path,
            Activity::Jupiter(a) => &a.path,
            Activity::Checksum(a) => &a.path,
            Activity::File(a) => &a.path,
            Activity::Editor(a) => &a.path,
            Activity::DeletionAcknowledgment(a) => &a.path,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Activity::TextEdit(_) => "TextEdit",
            Activity::Jupiter(_) => "Jupiter",
            Activity::Checksum(_) => "Checksum",
            Activity::File(_) => "File",
            Activity::Editor(_) => "Editor",
            Activity::DeletionAcknowledgment(_) => "DeletionAcknowledgment",
        }
    }
}

impl From<TextEditActivity> for Activity {
    fn from(a: TextEditActivity) -> Self { Activity::TextEdit(a) }
}

impl From<JupiterActivity> for Activity {
    fn from(a: JupiterActivity) -> Self { Activity::Jupiter(a) }
}

impl From<ChecksumActivity> for Activity {
    fn from(a: ChecksumActivity) -> Self { Activity::Checksum(a) }
}
