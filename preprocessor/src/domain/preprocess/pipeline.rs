//! Preprocessing Pipeline
//!
//! Wires stages together and runs them concurrently:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────────┐
//! │                          PREPROCESSING PIPELINE                            │
//! ├────────────────────────────────────────────────────────────────────────────┤
//! │                                                                            │
//! │  source   ┌───────────┐  chan  ┌──────────┐  chan  ┌────────────┐  chan    │
//! │  ───────▶ │1.BACKSLASH│ ─────▶ │2.COMMENTS│ ─────▶ │3.DIRECTIVES│ ─────┐   │
//! │           │  \<nl> →  │        │  // /**/ │        │  #include  │      │   │
//! │           │  joined   │        │  → ' '   │        │  → nested ─┼──┐   │   │
//! │           └───────────┘        └──────────┘        └────────────┘  │   │   │
//! │                                                                    │   ▼   │
//! │                                              PIPELINE (per include)┘  sink │
//! │                                                                            │
//! └────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Execution
//!
//! | Piece        | Runs on                    | Ends when                                   |
//! |--------------|----------------------------|---------------------------------------------|
//! | Each stage   | its own tokio task         | input reaches EOF, or the stage fails       |
//! | Output copy  | the caller of `run`        | the last stage's output reaches EOF         |
//! | `run`        | the caller                 | the copy is done and every task was joined  |
//!
//! Channels hold at most `channel_capacity` bytes, so a slow stage throttles every
//! stage before it. A failing stage drops both endpoints: stages after it see EOF
//! and drain normally, stages before it get `Disconnected` on their next write.
//! The result of `run` is the worst error across all stages and the copy.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use super::backslash::BackslashContinuationStripper;
use super::comments::CommentStripper;
use super::context::PipelineContext;
use super::directives::DirectiveRewriter;
use super::error::PreprocessError;
use super::stage::Stage;
use crate::data::channel::{ByteSink, ByteSource, channel};

/// Name the orchestrator reports its own failures under
const STAGE: &str = "pipeline";

/// Ordered chain of stages sharing one context
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
    ctx: Arc<PipelineContext>,
}

impl Pipeline {
    /// Empty pipeline; `run` copies the source to the sink unchanged.
    pub fn new(ctx: PipelineContext) -> Self {
        Self {
            stages: Vec::new(),
            ctx: Arc::new(ctx),
        }
    }

    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Continuations, then comments, then directives.
    pub fn standard(ctx: PipelineContext) -> Self {
        Self::new(ctx)
            .with_stage(BackslashContinuationStripper)
            .with_stage(CommentStripper)
            .with_stage(DirectiveRewriter)
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Run every stage over `source`, writing the final output into `sink`.
    ///
    /// The sink is flushed but not closed, so an enclosing stage can keep writing to
    /// it after a nested include. Boxed because includes recurse through here.
    pub fn run<'a>(
        &'a self,
        source: ByteSource,
        sink: &'a mut ByteSink,
    ) -> BoxFuture<'a, Result<(), PreprocessError>> {
        async move {
            let capacity = self.ctx.config().channel_capacity;
            tracing::debug!(
                source = source.name(),
                stages = ?self.stage_names(),
                depth = self.ctx.depth(),
                capacity,
                "Pipeline starting"
            );

            let mut handles = Vec::with_capacity(self.stages.len());
            let mut input = source;
            for stage in &self.stages {
                let (output, next) = channel(stage.name(), capacity);
                let stage = Arc::clone(stage);
                let ctx = Arc::clone(&self.ctx);
                let name = stage.name();
                let handle = tokio::spawn(async move { stage.run(input, output, &ctx).await });
                handles.push((name, handle));
                input = next;
            }

            let copied = sink.copy_from(&mut input).await;
            // Unblocks the last stage if the copy stopped early
            drop(input);

            let mut worst = None;
            for (name, handle) in handles {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(self.ctx.report(
                        STAGE,
                        PreprocessError::Process {
                            stage: name.to_string(),
                            message: e.to_string(),
                        },
                    )),
                };
                if let Err(e) = result {
                    tracing::debug!(stage = name, kind = e.kind(), "Stage failed");
                    worst = PreprocessError::worst(worst, e);
                }
            }

            match copied {
                Ok(bytes) => {
                    tracing::debug!(bytes, depth = self.ctx.depth(), "Pipeline output copied");
                }
                Err(e) => {
                    let e = self.ctx.report(STAGE, PreprocessError::io(sink.name(), e));
                    worst = PreprocessError::worst(worst, e);
                }
            }

            match worst {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
        .boxed()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .field("ctx", &self.ctx)
            .finish()
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
