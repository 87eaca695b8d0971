//! File-opening layer
//!
//! ## Architecture
//!
//! - `opener` - Trait every backend implements
//! - `filesystem` - Local filesystem backend (tokio::fs)
//! - `memory` - In-memory backend for tests and generated sources
//! - `error` - Error types for open failures

pub mod error;
pub mod filesystem;
pub mod memory;
pub mod opener;

pub use error::FileOpenError;
pub use filesystem::FilesystemOpener;
pub use memory::MemoryOpener;
pub use opener::{FileOpener, OpenedSource};
