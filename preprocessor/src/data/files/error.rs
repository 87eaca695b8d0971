//! File opener error types

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from opening files for reading or writing
#[derive(Error, Debug)]
pub enum FileOpenError {
    #[error("File not found: {}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot open {}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FileOpenError {
    /// Classify an OS error raised while opening `path`.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
                source,
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path, .. } | Self::Io { path, .. } => path,
        }
    }

    pub fn io_error(&self) -> &io::Error {
        match self {
            Self::NotFound { source, .. } | Self::Io { source, .. } => source,
        }
    }

    pub fn into_io_error(self) -> io::Error {
        match self {
            Self::NotFound { source, .. } | Self::Io { source, .. } => source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classified() {
        let err = FileOpenError::from_io(
            Path::new("missing.h"),
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        assert!(matches!(err, FileOpenError::NotFound { .. }));
        assert_eq!(err.to_string(), "File not found: missing.h");
        assert_eq!(err.path(), Path::new("missing.h"));
    }

    #[test]
    fn test_permission_denied_is_io() {
        let err = FileOpenError::from_io(
            Path::new("locked.h"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, FileOpenError::Io { .. }));
        assert!(err.to_string().contains("denied"));
        assert_eq!(err.io_error().kind(), io::ErrorKind::PermissionDenied);
    }
}
