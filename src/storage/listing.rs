//! Directory listing module

use serde::{Serialize, Serializer};
use tokio::fs;

use super::{StorageError, ValidatedPath};
use crate::config::StorageConfig;
use crate::logger;

/// A visible entry of a listed directory.
///
/// Serializes as its name, with a trailing `/` for directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub is_dir: bool,
}

impl DirectoryEntry {
    pub fn display_name(&self) -> String {
        if self.is_dir {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }
}

impl Serialize for DirectoryEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display_name())
    }
}

/// List the visible entries of `dir` in filesystem enumeration order.
///
/// Hidden entries (leading `.`) are skipped, as are names that are not valid
/// UTF-8: they could never be requested back through a `path` parameter.
/// Returns an empty list without touching the filesystem when listing is
/// disabled.
pub async fn list_directory(
    dir: &ValidatedPath,
    storage: &StorageConfig,
) -> Result<Vec<DirectoryEntry>, StorageError> {
    if storage.disable_directory_listing {
        return Ok(Vec::new());
    }

    let mut reader = fs::read_dir(dir.as_path()).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let name = match entry.file_name().into_string() {
            Ok(name) if !name.starts_with('.') => name,
            Ok(_) => continue,
            Err(raw) => {
                logger::log_debug(&format!("Skipping non UTF-8 entry {raw:?}"));
                continue;
            }
        };
        // file_type() does not follow symlinks
        let is_dir = entry.file_type().await?.is_dir();
        entries.push(DirectoryEntry { name, is_dir });
    }

    Ok(entries)
}
