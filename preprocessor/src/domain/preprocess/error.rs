//! Preprocessing error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::data::channel::is_disconnect;
use crate::data::files::FileOpenError;

/// Internal code for I/O failures without an OS errno (sysexits `EX_IOERR`)
const CODE_IO: i32 = 74;
/// Internal code for malformed input (sysexits `EX_DATAERR`)
const CODE_DATA: i32 = 65;
/// Internal code for a missing include (sysexits `EX_NOINPUT`)
const CODE_NO_INPUT: i32 = 66;
/// Internal code for a stage that never completed (sysexits `EX_SOFTWARE`)
const CODE_SOFTWARE: i32 = 70;

/// Errors produced by pipeline stages, the includer and the orchestrator
#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("I/O error on {handle}: {source}")]
    Io {
        handle: String,
        #[source]
        source: io::Error,
    },

    /// A write failed because the downstream reader already went away.
    #[error("{handle} was closed by its reader")]
    Disconnected { handle: String },

    #[error("#include has unbalanced quotes: {directive}")]
    MalformedInclude { directive: String },

    #[error("Include not found: {name}")]
    IncludeNotFound {
        name: String,
        #[source]
        source: FileOpenError,
    },

    #[error("Directive exceeds {max} bytes")]
    BufferOverflow { max: usize },

    #[error("Cyclic include of {}", path.display())]
    CyclicInclude { path: PathBuf },

    #[error("Unterminated block comment at end of input")]
    UnterminatedComment,

    #[error("Stage {stage} did not run to completion: {message}")]
    Process { stage: String, message: String },
}

impl PreprocessError {
    /// Wrap an I/O failure on `handle`, separating hang-ups from real errors.
    pub fn io(handle: &str, source: io::Error) -> Self {
        if is_disconnect(&source) {
            Self::Disconnected {
                handle: handle.to_string(),
            }
        } else {
            Self::Io {
                handle: handle.to_string(),
                source,
            }
        }
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::Disconnected { .. } => "disconnected",
            Self::MalformedInclude { .. } => "malformed_include",
            Self::IncludeNotFound { .. } => "include_not_found",
            Self::BufferOverflow { .. } => "buffer_overflow",
            Self::CyclicInclude { .. } => "cyclic_include",
            Self::UnterminatedComment => "unterminated_comment",
            Self::Process { .. } => "process",
        }
    }

    /// Rank used to pick the worst of several stage failures.
    ///
    /// Hang-ups rank lowest: they are the echo of a failure further downstream.
    pub fn severity(&self) -> u8 {
        match self {
            Self::Disconnected { .. } => 0,
            Self::Io { .. } => 1,
            Self::MalformedInclude { .. }
            | Self::IncludeNotFound { .. }
            | Self::BufferOverflow { .. }
            | Self::CyclicInclude { .. }
            | Self::UnterminatedComment => 2,
            Self::Process { .. } => 3,
        }
    }

    /// Underlying OS error, when there is one.
    pub fn os_error(&self) -> Option<&io::Error> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::IncludeNotFound { source, .. } => Some(source.io_error()),
            _ => None,
        }
    }

    /// Internal status code; OS errno where available.
    ///
    /// May fall outside the exit status range; see `core::exit::exit_code`.
    pub fn code(&self) -> i32 {
        if let Some(errno) = self.os_error().and_then(io::Error::raw_os_error) {
            return errno;
        }
        match self {
            Self::Io { .. } | Self::Disconnected { .. } => CODE_IO,
            Self::IncludeNotFound { .. } => CODE_NO_INPUT,
            Self::MalformedInclude { .. }
            | Self::BufferOverflow { .. }
            | Self::CyclicInclude { .. }
            | Self::UnterminatedComment => CODE_DATA,
            Self::Process { .. } => CODE_SOFTWARE,
        }
    }

    /// Keep whichever of `current` and `next` is worse; ties keep `current`.
    pub fn worst(current: Option<Self>, next: Self) -> Option<Self> {
        match current {
            Some(existing) if existing.severity() >= next.severity() => Some(existing),
            _ => Some(next),
        }
    }
}
