//! Streaming C preprocessor subset.
//!
//! Joins backslash-newline continuations, replaces comments with whitespace and
//! splices `#include "file"` directives recursively, one concurrent task per stage.

mod app;
pub mod core;
pub mod data;
pub mod domain;
pub mod utils;

pub use data::channel::{ByteSink, ByteSource};
pub use domain::preprocess::{Pipeline, PipelineContext, PreprocessError};
