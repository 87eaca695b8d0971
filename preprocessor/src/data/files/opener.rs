//! File opener trait definition
//!
//! Stages never touch the filesystem directly. The includer and the application
//! shell go through a `FileOpener`, which lets tests swap in an in-memory backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::error::FileOpenError;
use crate::data::channel::{ByteSink, ByteSource};

/// A freshly opened input together with its canonical identity
#[derive(Debug)]
pub struct OpenedSource {
    pub source: ByteSource,
    /// Stable identity used for include cycle detection
    pub identity: PathBuf,
}

/// Trait for file-opening backends
///
/// Implementations must be `Send + Sync`; a single opener is shared by every
/// nested pipeline of one preprocessing run.
#[async_trait]
pub trait FileOpener: Send + Sync {
    /// Open `path` for reading.
    async fn open_read(&self, path: &Path) -> Result<OpenedSource, FileOpenError>;

    /// Create or truncate `path` for writing with the given unix permission bits.
    async fn open_write(&self, path: &Path, mode: u32) -> Result<ByteSink, FileOpenError>;
}
