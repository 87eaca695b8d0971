//! Command-line application

use std::process::ExitCode;
use std::sync::Arc;

use crate::core::cli;
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME, DEFAULT_LOG_FILTER, ENV_LOG, EXIT_CONFIG};
use crate::core::diagnostics::{DiagnosticSink, TracingDiagnostics};
use crate::core::exit::exit_code;
use crate::data::files::{FileOpener, FilesystemOpener};
use crate::domain::preprocess::{Pipeline, PipelineContext, PreprocessError};

/// Name the application reports its own open/close failures under
const STAGE: &str = "main";

pub struct PreprocessApp {
    config: AppConfig,
    opener: Arc<dyn FileOpener>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl PreprocessApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> ExitCode {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!(app = APP_NAME, "Application starting");

        let cli_config = cli::parse();
        let config = match AppConfig::load(&cli_config) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("\nError: {e:#}\n");
                return ExitCode::from(EXIT_CONFIG);
            }
        };

        let app = Self::new(
            config,
            Arc::new(FilesystemOpener::new()),
            Arc::new(TracingDiagnostics),
        );
        match app.preprocess().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                let status = exit_code(e.code());
                tracing::debug!(kind = e.kind(), code = e.code(), status, "Preprocessing failed");
                ExitCode::from(status)
            }
        }
    }

    pub fn new(
        config: AppConfig,
        opener: Arc<dyn FileOpener>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            config,
            opener,
            diagnostics,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Preprocess the configured input into the configured output.
    ///
    /// The output is created (or truncated) before any input is read, and whatever
    /// the pipeline flushed before a failure stays in it.
    pub async fn preprocess(&self) -> Result<(), PreprocessError> {
        let root = PipelineContext::new(
            self.config.preprocess.clone(),
            Arc::clone(&self.opener),
            Arc::clone(&self.diagnostics),
        );
        let input = &self.config.input;
        let output = &self.config.output;

        let opened = self.opener.open_read(input).await.map_err(|e| {
            root.report(
                STAGE,
                PreprocessError::io(&input.display().to_string(), e.into_io_error()),
            )
        })?;

        let mut sink = self
            .opener
            .open_write(output, self.config.output_mode)
            .await
            .map_err(|e| {
                root.report(
                    STAGE,
                    PreprocessError::io(&output.display().to_string(), e.into_io_error()),
                )
            })?;

        let pipeline = Pipeline::standard(root.entered(&opened.source, &opened.identity));
        let result = pipeline.run(opened.source, &mut sink).await;

        let name = sink.name().to_string();
        let closed = sink
            .finish()
            .await
            .map_err(|e| root.report(STAGE, PreprocessError::io(&name, e)));

        result?;
        closed?;

        tracing::debug!(
            input = %input.display(),
            output = %output.display(),
            "Preprocessing complete"
        );
        Ok(())
    }

    fn init_logging() {
        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        // stdout is left alone; the preprocessed text goes to a file, logs to stderr
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }
}
