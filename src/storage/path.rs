//! Path validation module
//!
//! Turns a user-supplied relative path into a path that is guaranteed to stay
//! inside the configured base directory.
//!
//! The confinement rule is purely lexical: after cleaning, any segment that
//! starts with `.` is rejected. That single rule blocks `..` as well as hidden
//! entries, so joining the remaining segments onto the base can never escape it.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

use tokio::fs;

use super::StorageError;

/// What a validated path points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// An absolute path known to be inside the base directory.
///
/// Only [`validate_path`] can construct one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPath {
    path: PathBuf,
    kind: EntryKind,
}

impl ValidatedPath {
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Final component of the path, used for download names
    pub fn file_name(&self) -> Option<&OsStr> {
        self.path.file_name()
    }
}

impl fmt::Display for ValidatedPath {
    /// Directories render with exactly one trailing separator
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let display = self.path.display().to_string();
        match self.kind {
            EntryKind::Directory if !display.ends_with('/') => write!(f, "{display}/"),
            _ => f.write_str(&display),
        }
    }
}

/// Lexically clean a slash-separated path without touching the filesystem.
///
/// Collapses repeated separators, drops `.` segments, resolves `..` against the
/// preceding segment and drops `..` at the start of a rooted path. An empty
/// result becomes `"."`.
///
/// # Examples
/// ```
/// use filedrop::storage::clean_path;
/// assert_eq!(clean_path("a//b/./c/"), "a/b/c");
/// assert_eq!(clean_path("a/../../x"), "../x");
/// assert_eq!(clean_path("/../etc"), "/etc");
/// assert_eq!(clean_path(""), ".");
/// ```
pub fn clean_path(raw: &str) -> String {
    let rooted = raw.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !rooted {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Validate `raw` against `base` and stat the result.
///
/// Fails with [`StorageError::InvalidPath`] naming the first offending segment,
/// or with the OS error if the joined path cannot be stat'ed.
pub async fn validate_path(base: &Path, raw: &str) -> Result<ValidatedPath, StorageError> {
    let cleaned = clean_path(raw);

    if cleaned != "." && !cleaned.is_empty() {
        if let Some(segment) = cleaned.split('/').find(|s| s.starts_with('.')) {
            return Err(StorageError::InvalidPath(segment.to_string()));
        }
    }

    // Path::join replaces the base when handed an absolute path
    let relative = cleaned.trim_start_matches('/');
    let path = if relative.is_empty() || relative == "." {
        base.to_path_buf()
    } else {
        base.join(relative)
    };

    let metadata = fs::metadata(&path).await?;
    let kind = if metadata.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    };

    Ok(ValidatedPath { path, kind })
}
