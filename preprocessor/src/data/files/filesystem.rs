//! Filesystem-backed file opener

use std::path::Path;

use async_trait::async_trait;
use tokio::fs;

use super::error::FileOpenError;
use super::opener::{FileOpener, OpenedSource};
use crate::data::channel::{ByteSink, ByteSource};

/// Opens files on the local filesystem with tokio
#[derive(Debug, Clone, Default)]
pub struct FilesystemOpener;

impl FilesystemOpener {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileOpener for FilesystemOpener {
    async fn open_read(&self, path: &Path) -> Result<OpenedSource, FileOpenError> {
        let file = fs::File::open(path)
            .await
            .map_err(|e| FileOpenError::from_io(path, e))?;

        // The file is already open, so canonicalize only fails on exotic races.
        let identity = fs::canonicalize(path)
            .await
            .unwrap_or_else(|_| path.to_path_buf());

        tracing::trace!(path = %path.display(), identity = %identity.display(), "Opened for reading");

        Ok(OpenedSource {
            source: ByteSource::from_path(path, file),
            identity,
        })
    }

    async fn open_write(&self, path: &Path, mode: u32) -> Result<ByteSink, FileOpenError> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(mode);
        #[cfg(not(unix))]
        let _ = mode;

        let file = options
            .open(path)
            .await
            .map_err(|e| FileOpenError::from_io(path, e))?;

        tracing::trace!(path = %path.display(), mode = %format!("{mode:o}"), "Opened for writing");

        Ok(ByteSink::new(path.display().to_string(), file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_read_reports_canonical_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.h");
        std::fs::write(&path, "int a;\n").unwrap();

        let opened = FilesystemOpener::new().open_read(&path).await.unwrap();
        assert_eq!(opened.identity, std::fs::canonicalize(&path).unwrap());
        assert_eq!(opened.source.path(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_open_read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = FilesystemOpener::new()
            .open_read(&dir.path().join("nope.h"))
            .await
            .unwrap_err();
        assert!(matches!(err, FileOpenError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_open_write_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.c");
        std::fs::write(&path, "old contents that are longer").unwrap();

        let mut sink = FilesystemOpener::new().open_write(&path, 0o644).await.unwrap();
        sink.write_all(b"new").await.unwrap();
        sink.finish().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }
}
