//! Stage trait and endpoint helpers
//!
//! A stage is a self-contained byte-to-byte transformation. It owns its input and
//! output endpoints for the duration of one `run` and releases both on every exit
//! path: the output is shut down on success and flushed then dropped on error, which
//! the neighbouring stages observe as end-of-stream or a hang-up.

use std::future::Future;
use std::panic::Location;

use async_trait::async_trait;

use super::context::PipelineContext;
use super::error::PreprocessError;
use crate::data::channel::{ByteSink, ByteSource};

/// One transformation in a pipeline
#[async_trait]
pub trait Stage: Send + Sync {
    /// Name used in diagnostics and logs
    fn name(&self) -> &'static str;

    async fn run(
        &self,
        source: ByteSource,
        sink: ByteSink,
        ctx: &PipelineContext,
    ) -> Result<(), PreprocessError>;
}

/// Input endpoint that reports read failures against its stage
pub struct StageInput<'a> {
    stage: &'static str,
    source: ByteSource,
    ctx: &'a PipelineContext,
}

impl<'a> StageInput<'a> {
    pub fn new(stage: &'static str, source: ByteSource, ctx: &'a PipelineContext) -> Self {
        Self { stage, source, ctx }
    }

    /// Next byte, `None` at end of stream.
    #[track_caller]
    pub fn next_byte(&mut self) -> impl Future<Output = Result<Option<u8>, PreprocessError>> + Send {
        let location = Location::caller();
        async move {
            self.source.read_one().await.map_err(|e| {
                self.ctx.report_at(
                    location,
                    self.stage,
                    PreprocessError::io(self.source.name(), e),
                )
            })
        }
    }
}

/// Output endpoint that reports write failures against its stage
pub struct StageOutput<'a> {
    stage: &'static str,
    sink: ByteSink,
    ctx: &'a PipelineContext,
}

impl<'a> StageOutput<'a> {
    pub fn new(stage: &'static str, sink: ByteSink, ctx: &'a PipelineContext) -> Self {
        Self { stage, sink, ctx }
    }

    #[track_caller]
    pub fn put(&mut self, byte: u8) -> impl Future<Output = Result<(), PreprocessError>> + Send {
        let location = Location::caller();
        async move {
            let result = self.sink.write_one(byte).await;
            self.check(location, result)
        }
    }

    #[track_caller]
    pub fn put_all(
        &mut self,
        bytes: &[u8],
    ) -> impl Future<Output = Result<(), PreprocessError>> + Send {
        let location = Location::caller();
        async move {
            let result = self.sink.write_all(bytes).await;
            self.check(location, result)
        }
    }

    /// Raw sink, for splicing a nested pipeline's output.
    pub fn sink_mut(&mut self) -> &mut ByteSink {
        &mut self.sink
    }

    /// Close the output after the stage body returned `result`.
    ///
    /// On success the output is flushed and shut down. On failure whatever the stage
    /// already emitted is still pushed downstream before the output is dropped, so
    /// completed lines ahead of the failure reach the final sink.
    #[track_caller]
    pub fn close(
        self,
        result: Result<(), PreprocessError>,
    ) -> impl Future<Output = Result<(), PreprocessError>> + Send {
        let location = Location::caller();
        async move {
            match result {
                Ok(()) => self.finish_at(location).await,
                Err(e) => {
                    self.abort().await;
                    Err(e)
                }
            }
        }
    }

    async fn finish_at(self, location: &'static Location<'static>) -> Result<(), PreprocessError> {
        let name = self.sink.name().to_string();
        let (stage, ctx) = (self.stage, self.ctx);
        self.sink
            .finish()
            .await
            .map_err(|e| ctx.report_at(location, stage, PreprocessError::io(&name, e)))
    }

    /// Best-effort flush on the failure path; the stage error is what gets reported.
    async fn abort(mut self) {
        if let Err(e) = self.sink.flush().await {
            tracing::debug!(
                stage = self.stage,
                sink = self.sink.name(),
                error = %e,
                "Could not flush output of failed stage"
            );
        }
    }

    fn check(
        &self,
        location: &'static Location<'static>,
        result: std::io::Result<()>,
    ) -> Result<(), PreprocessError> {
        result.map_err(|e| {
            self.ctx
                .report_at(location, self.stage, PreprocessError::io(self.sink.name(), e))
        })
    }
}
