//! Domain logic
//!
//! - `preprocess` - Stages, includer and the pipeline orchestrator

pub mod preprocess;
