//! Preprocessing domain
//!
//! ## Architecture
//!
//! - `stage` - Stage trait and the input/output endpoint helpers
//! - `backslash` - Stage 1, backslash-newline continuations
//! - `comments` - Stage 2, comment replacement
//! - `directives` - Stage 3, directive detection and dispatch
//! - `include` - Includer, recursive `#include "file"` expansion
//! - `pipeline` - Orchestrator running the stages concurrently
//! - `context` - Per-pipeline configuration, opener, diagnostics and include chain
//! - `error` - Error types and severity ranking

mod backslash;
mod comments;
mod context;
mod directives;
mod error;
mod include;
mod pipeline;
mod stage;

pub use backslash::BackslashContinuationStripper;
pub use comments::CommentStripper;
pub use context::PipelineContext;
pub use directives::DirectiveRewriter;
pub use error::PreprocessError;
pub use include::{
    INCLUDE_KEYWORD, INCLUDE_NAME_OFFSET, include, include_candidates, parse_include_name,
};
pub use pipeline::Pipeline;
pub use stage::{Stage, StageInput, StageOutput};
