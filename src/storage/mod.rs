//! Storage layer
//!
//! Everything that touches the served directory tree lives here:
//! - Path validation (confines every request to the base directory)
//! - Directory listing
//! - Collision-free upload writing

mod error;
pub mod listing;
pub mod path;
pub mod upload;

pub use error::StorageError;
pub use listing::{list_directory, DirectoryEntry};
pub use path::{clean_path, validate_path, EntryKind, ValidatedPath};
pub use upload::{upload_file, UploadReceipt, UploadTarget};
