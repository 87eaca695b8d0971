//! Core application infrastructure

pub mod cli;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod exit;

pub use crate::app::PreprocessApp;
pub use cli::CliConfig;
pub use config::{AppConfig, PreprocessConfig};
pub use diagnostics::{Diagnostic, DiagnosticSink, MemoryDiagnostics, TracingDiagnostics};
pub use exit::exit_code;
