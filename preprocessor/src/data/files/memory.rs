//! In-memory file opener
//!
//! Serves reads from a map of path to contents and captures writes in shared
//! buffers. Used by tests and by embedders that preprocess generated sources.
//!
//! Paths are compared after dropping `.` components, so `./a.h` and `a.h` name the
//! same entry. There is no working directory: relative paths are keys as-is.

use std::collections::HashMap;
use std::io::{self, Cursor};
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::io::AsyncWrite;

use super::error::FileOpenError;
use super::opener::{FileOpener, OpenedSource};
use crate::data::channel::{ByteSink, ByteSource};

/// Growable buffer shared between a sink and the opener that created it
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl AsyncWrite for SharedBuffer {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.0.lock().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// In-memory `FileOpener`
#[derive(Default)]
pub struct MemoryOpener {
    files: RwLock<HashMap<PathBuf, Vec<u8>>>,
    written: Mutex<HashMap<PathBuf, SharedBuffer>>,
    opened: Mutex<Vec<PathBuf>>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`MemoryOpener::insert`].
    pub fn with_file(self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        self.files
            .write()
            .insert(normalize(path.as_ref()), contents.into());
    }

    /// Bytes written so far to `path` through `open_write`.
    pub fn written(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.written
            .lock()
            .get(&normalize(path.as_ref()))
            .map(|buf| buf.0.lock().clone())
    }

    /// Every path successfully opened for reading, in order.
    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().clone()
    }
}

#[async_trait]
impl FileOpener for MemoryOpener {
    async fn open_read(&self, path: &Path) -> Result<OpenedSource, FileOpenError> {
        let key = normalize(path);
        let contents = self.files.read().get(&key).cloned().ok_or_else(|| {
            FileOpenError::from_io(
                path,
                io::Error::new(io::ErrorKind::NotFound, "no such file in memory opener"),
            )
        })?;

        self.opened.lock().push(key.clone());
        Ok(OpenedSource {
            source: ByteSource::from_path(path, Cursor::new(contents)),
            identity: key,
        })
    }

    async fn open_write(&self, path: &Path, _mode: u32) -> Result<ByteSink, FileOpenError> {
        let buffer = SharedBuffer::default();
        self.written.lock().insert(normalize(path), buffer.clone());
        Ok(ByteSink::new(path.display().to_string(), buffer))
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
