//! Upload writer module
//!
//! Picks a destination that never clobbers an existing entry and copies the
//! incoming stream into it.
//!
//! Each candidate is opened with exclusive create, so two uploads racing for the
//! same name cannot both win: the loser sees `AlreadyExists` and moves on to the
//! next suffix.

use std::io;
use std::path::{Path, PathBuf};

use futures_util::{Stream, StreamExt};
use hyper::body::Bytes;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::{StorageError, ValidatedPath};
use crate::config::StorageConfig;
use crate::logger;

/// A candidate destination paired with its disambiguation index.
///
/// Index 0 is the original name; index `n` inserts `" (n)"` before the extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub path: PathBuf,
    pub index: u32,
}

impl UploadTarget {
    pub fn new(dir: &Path, file_name: &str, index: u32) -> Self {
        Self {
            path: dir.join(candidate_name(file_name, index)),
            index,
        }
    }
}

/// Result of a completed upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Name for the `index`-th candidate, always derived from the original name
///
/// # Examples
/// ```
/// use filedrop::storage::upload::candidate_name;
/// assert_eq!(candidate_name("report.pdf", 0), "report.pdf");
/// assert_eq!(candidate_name("report.pdf", 2), "report (2).pdf");
/// assert_eq!(candidate_name("README", 1), "README (1)");
/// ```
pub fn candidate_name(file_name: &str, index: u32) -> String {
    if index == 0 {
        return file_name.to_string();
    }
    let (stem, extension) = split_extension(file_name);
    format!("{stem} ({index}){extension}")
}

/// Split at the last `.`; the extension keeps its dot
fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(pos) => file_name.split_at(pos),
        None => (file_name, ""),
    }
}

/// Reduce a client-supplied file name to a safe final component.
///
/// Anything up to the last `/` or `\` is dropped; the rest is kept as sent.
/// Empty and hidden names (which covers `.` and `..`) are rejected.
pub fn sanitize_file_name(raw: &str) -> Result<&str, StorageError> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    if base.is_empty() || base.starts_with('.') {
        return Err(StorageError::InvalidFileName(base.to_string()));
    }
    Ok(base)
}

/// Store `content` as `file_name` inside `dir`.
///
/// On a read or write failure the partial file is removed unless
/// `keep_partial_uploads_on_error` is set; the copy error is returned either way.
/// Dropping the returned future mid-copy also removes the partial file.
pub async fn upload_file<S>(
    dir: &ValidatedPath,
    file_name: &str,
    content: S,
    storage: &StorageConfig,
) -> Result<UploadReceipt, StorageError>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    if !dir.is_dir() {
        return Err(StorageError::NotADirectory);
    }
    let file_name = sanitize_file_name(file_name)?;

    let (target, file) = create_target(dir.as_path(), file_name).await?;
    let mut partial = PartialFile::new(target.path.clone());
    if storage.keep_partial_uploads_on_error {
        partial.keep();
    }
    // Declared after the guard so the handle closes before any removal
    let mut file = file;
    if target.index > 0 {
        logger::log_debug(&format!(
            "Upload name '{file_name}' taken, using '{}'",
            target.path.display()
        ));
    }

    let copied = write_stream(&mut file, content).await;
    // Settle queued writes so a kept partial file holds everything received
    let flushed = file.flush().await;
    drop(file);

    match copied.and_then(|bytes| flushed.map(|()| bytes)) {
        Ok(bytes) => {
            partial.keep();
            Ok(UploadReceipt {
                path: target.path,
                bytes,
            })
        }
        Err(err) => {
            if storage.keep_partial_uploads_on_error {
                logger::log_warning(&format!(
                    "Keeping partial upload '{}'",
                    target.path.display()
                ));
            }
            Err(StorageError::Io(err))
        }
    }
}

/// Removes an unfinished upload when dropped, unless kept.
///
/// Covers both copy errors and the upload future being cancelled, e.g. by a
/// connection timeout or shutdown.
struct PartialFile {
    path: Option<PathBuf>,
}

impl PartialFile {
    const fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn keep(&mut self) {
        self.path = None;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => logger::log_info(&format!("Removed partial upload '{}'", path.display())),
            Err(e) => logger::log_warning(&format!(
                "Failed to remove partial upload '{}': {e}",
                path.display()
            )),
        }
    }
}

/// Create the first free candidate with exclusive create
async fn create_target(dir: &Path, file_name: &str) -> Result<(UploadTarget, File), StorageError> {
    let mut index = 0;
    loop {
        let target = UploadTarget::new(dir, file_name, index);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target.path)
            .await
        {
            Ok(file) => return Ok((target, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => index += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

async fn write_stream<S>(file: &mut File, content: S) -> io::Result<u64>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    let mut content = std::pin::pin!(content);
    let mut written = 0u64;
    while let Some(chunk) = content.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::validate_path;
    use futures_util::stream;
    use tempfile::TempDir;

    fn storage(keep_partial: bool) -> StorageConfig {
        StorageConfig {
            base_path: PathBuf::from("."),
            disable_directory_listing: false,
            keep_partial_uploads_on_error: keep_partial,
        }
    }

    fn body(chunks: &[&'static [u8]]) -> impl Stream<Item = io::Result<Bytes>> {
        stream::iter(
            chunks
                .iter()
                .map(|c| Ok(Bytes::from_static(*c)))
                .collect::<Vec<_>>(),
        )
    }

    fn broken_body() -> impl Stream<Item = io::Result<Bytes>> {
        stream::iter(vec![
            Ok(Bytes::from_static(b"first half")),
            Err(io::Error::other("connection reset")),
        ])
    }

    #[test]
    fn test_candidate_names() {
        assert_eq!(candidate_name("report.pdf", 0), "report.pdf");
        assert_eq!(candidate_name("report.pdf", 1), "report (1).pdf");
        assert_eq!(candidate_name("report.pdf", 12), "report (12).pdf");
        assert_eq!(candidate_name("archive.tar.gz", 1), "archive.tar (1).gz");
        assert_eq!(candidate_name("Makefile", 3), "Makefile (3)");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("report.pdf").unwrap(), "report.pdf");
        assert_eq!(sanitize_file_name("dir/sub/report.pdf").unwrap(), "report.pdf");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\a.txt").unwrap(), "a.txt");
        assert!(sanitize_file_name("").is_err());
        assert!(sanitize_file_name("..").is_err());
        assert!(sanitize_file_name("../..").is_err());
        assert!(sanitize_file_name(".bashrc").is_err());
        assert!(sanitize_file_name("dir/").is_err());
    }

    #[test]
    fn test_sanitize_keeps_whitespace() {
        assert_eq!(sanitize_file_name(" a.txt").unwrap(), " a.txt");
        assert_eq!(sanitize_file_name("dir/notes .md ").unwrap(), "notes .md ");
    }

    #[tokio::test]
    async fn test_upload_writes_content() {
        let dir = TempDir::new().unwrap();
        let root = validate_path(dir.path(), "").await.unwrap();

        let receipt = upload_file(&root, "a.txt", body(&[b"hello ", b"world"]), &storage(false))
            .await
            .unwrap();

        assert_eq!(receipt.path, dir.path().join("a.txt"));
        assert_eq!(receipt.bytes, 11);
        assert_eq!(std::fs::read(&receipt.path).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_collisions_never_overwrite() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("report.pdf"), b"original").unwrap();
        let root = validate_path(dir.path(), "").await.unwrap();

        let first = upload_file(&root, "report.pdf", body(&[b"one"]), &storage(false))
            .await
            .unwrap();
        assert_eq!(first.path, dir.path().join("report (1).pdf"));

        let second = upload_file(&root, "report.pdf", body(&[b"two"]), &storage(false))
            .await
            .unwrap();
        assert_eq!(second.path, dir.path().join("report (2).pdf"));

        assert_eq!(std::fs::read(dir.path().join("report.pdf")).unwrap(), b"original");
        assert_eq!(std::fs::read(&first.path).unwrap(), b"one");
        assert_eq!(std::fs::read(&second.path).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_existing_directory_counts_as_collision() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();
        let root = validate_path(dir.path(), "").await.unwrap();

        let receipt = upload_file(&root, "data", body(&[b"x"]), &storage(false))
            .await
            .unwrap();
        assert_eq!(receipt.path, dir.path().join("data (1)"));
    }

    #[tokio::test]
    async fn test_concurrent_uploads_get_distinct_names() {
        let dir = TempDir::new().unwrap();
        let root = validate_path(dir.path(), "").await.unwrap();
        let config = storage(false);

        let (a, b) = tokio::join!(
            upload_file(&root, "same.bin", body(&[b"a"]), &config),
            upload_file(&root, "same.bin", body(&[b"b"]), &config),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.path, b.path);
    }

    #[tokio::test]
    async fn test_failed_upload_is_removed() {
        let dir = TempDir::new().unwrap();
        let root = validate_path(dir.path(), "").await.unwrap();

        let err = upload_file(&root, "big.iso", broken_body(), &storage(false))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert!(!dir.path().join("big.iso").exists());
    }

    #[tokio::test]
    async fn test_failed_upload_is_kept_when_configured() {
        let dir = TempDir::new().unwrap();
        let root = validate_path(dir.path(), "").await.unwrap();

        let err = upload_file(&root, "big.iso", broken_body(), &storage(true))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
        assert_eq!(std::fs::read(dir.path().join("big.iso")).unwrap(), b"first half");
    }

    #[tokio::test]
    async fn test_cancelled_upload_is_removed() {
        let dir = TempDir::new().unwrap();
        let root = validate_path(dir.path(), "").await.unwrap();
        let config = storage(false);

        let stalled = stream::iter(vec![Ok(Bytes::from_static(b"head"))])
            .chain(stream::pending::<io::Result<Bytes>>());
        let result = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            upload_file(&root, "slow.bin", stalled, &config),
        )
        .await;

        assert!(result.is_err());
        assert!(!dir.path().join("slow.bin").exists());
    }

    #[tokio::test]
    async fn test_cancelled_upload_is_kept_when_configured() {
        let dir = TempDir::new().unwrap();
        let root = validate_path(dir.path(), "").await.unwrap();
        let config = storage(true);

        let stalled = stream::pending::<io::Result<Bytes>>();
        let result = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            upload_file(&root, "slow.bin", stalled, &config),
        )
        .await;

        assert!(result.is_err());
        assert!(dir.path().join("slow.bin").exists());
    }

    #[tokio::test]
    async fn test_upload_into_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        let file = validate_path(dir.path(), "a.txt").await.unwrap();

        let err = upload_file(&file, "b.txt", body(&[b"b"]), &storage(false))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotADirectory));
    }

    #[tokio::test]
    async fn test_traversal_file_name_is_stripped() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("inbox")).unwrap();
        let inbox = validate_path(dir.path(), "inbox").await.unwrap();

        let receipt = upload_file(&inbox, "../../escape.txt", body(&[b"x"]), &storage(false))
            .await
            .unwrap();
        assert_eq!(receipt.path, dir.path().join("inbox/escape.txt"));
    }
}
