//! Stage 1: backslash-newline continuations
//!
//! Drops every `\` immediately followed by `\n`, merging the two physical lines.
//! Any other backslash is passed through together with the byte after it.

use async_trait::async_trait;

use super::context::PipelineContext;
use super::error::PreprocessError;
use super::stage::{Stage, StageInput, StageOutput};
use crate::data::channel::{ByteSink, ByteSource};

const STAGE: &str = "backslash_continuations";

#[derive(Debug, Clone, Copy, Default)]
pub struct BackslashContinuationStripper;

#[async_trait]
impl Stage for BackslashContinuationStripper {
    fn name(&self) -> &'static str {
        STAGE
    }

    async fn run(
        &self,
        source: ByteSource,
        sink: ByteSink,
        ctx: &PipelineContext,
    ) -> Result<(), PreprocessError> {
        let mut input = StageInput::new(STAGE, source, ctx);
        let mut output = StageOutput::new(STAGE, sink, ctx);
        let result = join_lines(&mut input, &mut output).await;
        output.close(result).await
    }
}

async fn join_lines(
    input: &mut StageInput<'_>,
    output: &mut StageOutput<'_>,
) -> Result<(), PreprocessError> {
    let mut have_backslash = false;

    while let Some(byte) = input.next_byte().await? {
        if have_backslash {
            have_backslash = false;
            if byte == b'\n' {
                continue;
            }
            output.put(b'\\').await?;
        }
        if byte == b'\\' {
            have_backslash = true;
        } else {
            output.put(byte).await?;
        }
    }

    // A backslash at end of input has nothing to join with.
    if have_backslash {
        output.put(b'\\').await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::preprocess::testing::run_stage;

    #[tokio::test]
    async fn test_joins_continued_lines() {
        let (out, result) = run_stage(BackslashContinuationStripper, b"a\\\nb").await;
        result.unwrap();
        assert_eq!(out, b"ab");
    }

    #[tokio::test]
    async fn test_joins_inside_surrounding_text() {
        let input = b"#define LONG(x) \\\n    ((x) + 1)\nint y;\n";
        let (out, result) = run_stage(BackslashContinuationStripper, input).await;
        result.unwrap();
        assert_eq!(out, b"#define LONG(x)     ((x) + 1)\nint y;\n");
    }

    #[tokio::test]
    async fn test_other_escapes_pass_through() {
        let (out, result) = run_stage(BackslashContinuationStripper, b"\"a\\tb\\n\"\n").await;
        result.unwrap();
        assert_eq!(out, b"\"a\\tb\\n\"\n");
    }

    #[tokio::test]
    async fn test_double_backslash_before_newline() {
        // The second backslash is the one that joins the line.
        let (out, result) = run_stage(BackslashContinuationStripper, b"x\\\\\ny").await;
        result.unwrap();
        assert_eq!(out, b"x\\y");
    }

    #[tokio::test]
    async fn test_trailing_backslash_kept() {
        let (out, result) = run_stage(BackslashContinuationStripper, b"end\\").await;
        result.unwrap();
        assert_eq!(out, b"end\\");
    }

    #[tokio::test]
    async fn test_empty_input() {
        let (out, result) = run_stage(BackslashContinuationStripper, b"").await;
        result.unwrap();
        assert!(out.is_empty());
    }
}
