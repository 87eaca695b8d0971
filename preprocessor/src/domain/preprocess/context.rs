//! Per-pipeline context
//!
//! Everything a stage may consult besides its two endpoints: configuration, the
//! file opener, the diagnostic sink and the include chain leading to this pipeline.
//! A context is immutable once built; nested pipelines get a derived copy.

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::PreprocessError;
use crate::core::config::PreprocessConfig;
use crate::core::diagnostics::{Diagnostic, DiagnosticSink};
use crate::data::channel::ByteSource;
use crate::data::files::FileOpener;

#[derive(Clone)]
pub struct PipelineContext {
    config: Arc<PreprocessConfig>,
    opener: Arc<dyn FileOpener>,
    diagnostics: Arc<dyn DiagnosticSink>,
    /// Identities of the files currently being expanded, outermost first
    include_stack: Vec<PathBuf>,
    /// Directory of the file this pipeline reads, when it has one
    base_dir: Option<PathBuf>,
}

impl PipelineContext {
    pub fn new(
        config: PreprocessConfig,
        opener: Arc<dyn FileOpener>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            opener,
            diagnostics,
            include_stack: Vec::new(),
            base_dir: None,
        }
    }

    /// Context for a pipeline reading `source`, whose identity is `identity`.
    pub fn entered(&self, source: &ByteSource, identity: &Path) -> Self {
        let mut include_stack = self.include_stack.clone();
        include_stack.push(identity.to_path_buf());
        Self {
            config: Arc::clone(&self.config),
            opener: Arc::clone(&self.opener),
            diagnostics: Arc::clone(&self.diagnostics),
            include_stack,
            base_dir: source
                .path()
                .and_then(Path::parent)
                .map(Path::to_path_buf),
        }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    pub fn opener(&self) -> &dyn FileOpener {
        self.opener.as_ref()
    }

    pub fn include_stack(&self) -> &[PathBuf] {
        &self.include_stack
    }

    /// Nesting depth; 0 for a pipeline over an anonymous source.
    pub fn depth(&self) -> usize {
        self.include_stack.len()
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Record `error` against `stage` at the caller's location and hand it back.
    #[track_caller]
    pub fn report(&self, stage: &str, error: PreprocessError) -> PreprocessError {
        self.report_at(Location::caller(), stage, error)
    }

    /// Hang-ups only echo a failure another stage already reported, so they are
    /// traced at debug level instead of recorded.
    pub fn report_at(
        &self,
        location: &'static Location<'static>,
        stage: &str,
        error: PreprocessError,
    ) -> PreprocessError {
        if let PreprocessError::Disconnected { handle } = &error {
            tracing::debug!(
                stage,
                handle = %handle,
                file = location.file(),
                line = location.line(),
                "Downstream closed early"
            );
        } else {
            self.diagnostics
                .record(Diagnostic::new(stage, &error, location));
        }
        error
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("config", &self.config)
            .field("include_stack", &self.include_stack)
            .field("base_dir", &self.base_dir)
            .finish()
    }
}
