//! Storage error taxonomy
//!
//! Every variant is surfaced to clients as a `400` with the Display text as body.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A path segment is hidden or tries to climb out of the base directory
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The requested entry does not exist
    #[error("{0}")]
    NotFound(#[source] io::Error),

    /// Any other filesystem failure
    #[error("{0}")]
    Io(#[source] io::Error),

    #[error("not a directory")]
    NotADirectory,

    #[error("{0}")]
    MalformedMultipart(String),

    /// The multipart body ended without a `myFile` part
    #[error("unknown payload")]
    UnknownPayload,

    #[error("invalid file name: {0}")]
    InvalidFileName(String),
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::NotFound(err)
        } else {
            Self::Io(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_classified() {
        let err = StorageError::from(io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, StorageError::NotFound(_)));

        let err = StorageError::from(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, StorageError::Io(_)));
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            StorageError::InvalidPath("..".to_string()).to_string(),
            "invalid path: .."
        );
        assert_eq!(StorageError::NotADirectory.to_string(), "not a directory");
        assert_eq!(StorageError::UnknownPayload.to_string(), "unknown payload");
        assert_eq!(
            StorageError::InvalidFileName(".env".to_string()).to_string(),
            "invalid file name: .env"
        );
    }
}
