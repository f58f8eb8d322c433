//! Immutable snapshot of a filesystem node at the moment it was observed.
//!
//! Listings and searches build one [`PathEntry`] per child they see. The
//! entry never changes afterwards; a caller that drains it owns its copy.
//! Sizes stay at `0` here because a recursive size is a separate operation.

use crate::classify::{Classifier, TypeTag};
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::Serialize;
use std::fs::Metadata;
use std::path::Path;

/// Whether an entry is a folder or anything else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

impl EntryKind {
    /// Kind of a node as seen through (possibly link-following) metadata.
    pub fn of(metadata: &Metadata) -> Self {
        if metadata.is_dir() {
            Self::Folder
        } else {
            Self::File
        }
    }
}

/// One observed file or folder, in the shape front ends consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathEntry {
    /// Last path component (the wire path itself for roots).
    pub name: CompactString,
    /// Absolute path, forward-slash separated.
    pub path: String,
    pub kind: EntryKind,
    /// Timestamps in UTC, serialised as RFC 3339. `None` when the platform
    /// does not record that timestamp.
    pub modified: Option<DateTime<Utc>>,
    pub accessed: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
    /// Semantic tag from the classifier.
    #[serde(rename = "type")]
    pub type_tag: TypeTag,
    /// Always `0` at observation time.
    pub size: u64,
    /// Parent path, forward-slash separated (empty for roots).
    pub parent: String,
}

impl PathEntry {
    /// Observe `path` now.
    ///
    /// Returns `None` when the path vanished before it could be statted.
    /// Symbolic links are described by their target; a dangling link is
    /// reported as a file tagged `unknown`.
    pub fn observe(path: &Path, classifier: &Classifier) -> Option<Self> {
        let link_meta = std::fs::symlink_metadata(path).ok()?;
        let metadata = std::fs::metadata(path).unwrap_or(link_meta);
        Some(Self::from_metadata(path, &metadata, classifier))
    }

    /// Build an entry from metadata the caller already holds.
    pub fn from_metadata(path: &Path, metadata: &Metadata, classifier: &Classifier) -> Self {
        let path_str = wire_path(path);
        let name = match path.file_name() {
            Some(n) => CompactString::new(n.to_string_lossy()),
            None => CompactString::new(&path_str),
        };
        let kind = EntryKind::of(metadata);
        let type_tag = if metadata.is_dir() || metadata.is_file() {
            classifier.classify_name(&name, kind)
        } else {
            TypeTag::UNKNOWN
        };

        Self {
            name,
            kind,
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            accessed: metadata.accessed().ok().map(DateTime::<Utc>::from),
            created: metadata.created().ok().map(DateTime::<Utc>::from),
            type_tag,
            size: 0,
            parent: path.parent().map(wire_path).unwrap_or_default(),
            path: path_str,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

/// Render a path the way it travels on the wire: lossy UTF-8 with `/`
/// separators on every host.
pub fn wire_path(path: &Path) -> String {
    let s = path.to_string_lossy();
    if cfg!(windows) {
        s.replace('\\', "/")
    } else {
        s.into_owned()
    }
}
