//! Transfer unit and blob representation.

use std::fmt;

use bytes::Bytes;

/// Kind of media moving through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Top-level storage folder for this kind.
    pub fn folder_prefix(&self) -> &'static str {
        match self {
            MediaKind::Image => "img",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// One URL queued for fetching.
///
/// `index` is its position within its batch and is the only key used to
/// track it; two units may well derive the same filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferUnit {
    pub index: usize,
    pub url: String,
    pub kind: MediaKind,
}

impl TransferUnit {
    pub fn new(index: usize, url: String, kind: MediaKind) -> Self {
        Self { index, url, kind }
    }
}

/// Downloaded bytes plus the filename derived for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedBlob {
    pub filename: String,
    pub bytes: Bytes,
}

impl NamedBlob {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Same bytes under a different name.
    pub fn renamed(&self, filename: String) -> Self {
        Self {
            filename,
            bytes: self.bytes.clone(),
        }
    }
}
