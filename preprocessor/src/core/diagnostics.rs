//! Diagnostic sinks
//!
//! Every failure is recorded exactly once, where it is detected, together with the
//! source location of the failing check and the OS error when there is one.

use std::fmt;
use std::panic::Location;

use parking_lot::Mutex;

use crate::domain::preprocess::PreprocessError;

/// One recorded failure
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Stage (or component) that detected the failure
    pub stage: String,
    /// Error kind, see `PreprocessError::kind`
    pub kind: &'static str,
    pub message: String,
    pub file: &'static str,
    pub line: u32,
    pub errno: Option<i32>,
    pub os_error: Option<String>,
}

impl Diagnostic {
    pub fn new(stage: &str, error: &PreprocessError, location: &'static Location<'static>) -> Self {
        let os = error.os_error();
        Self {
            stage: stage.to_string(),
            kind: error.kind(),
            message: error.to_string(),
            file: location.file(),
            line: location.line(),
            errno: os.and_then(|e| e.raw_os_error()),
            os_error: os.map(|e| e.to_string()),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: [{}] {}", self.file, self.line, self.stage, self.message)?;
        match (self.errno, &self.os_error) {
            (Some(errno), Some(desc)) => write!(f, " (errno: {errno}, {desc})"),
            (None, Some(desc)) => write!(f, " ({desc})"),
            _ => Ok(()),
        }
    }
}

/// Append-only destination for diagnostics
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to the `tracing` subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn record(&self, d: Diagnostic) {
        tracing::error!(
            stage = %d.stage,
            kind = d.kind,
            file = d.file,
            line = d.line,
            errno = ?d.errno,
            os_error = ?d.os_error,
            "{}",
            d.message
        );
    }
}

/// Collects diagnostics in memory
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.lock().clone()
    }

    /// Formatted lines, as a log file would show them.
    pub fn lines(&self) -> Vec<String> {
        self.entries.lock().iter().map(ToString::to_string).collect()
    }
}

impl DiagnosticSink for MemoryDiagnostics {
    fn record(&self, diagnostic: Diagnostic) {
        self.entries.lock().push(diagnostic);
    }
}
