//! I/O layer
//!
//! - `channel` - Bounded byte channels and the `ByteSource`/`ByteSink` endpoints
//! - `files` - File-opening backends (filesystem and in-memory)

pub mod channel;
pub mod files;

pub use channel::{ByteSink, ByteSource};
pub use files::{FileOpenError, FileOpener, FilesystemOpener, MemoryOpener, OpenedSource};
