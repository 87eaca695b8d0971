//! Stage 3: directive rewriting
//!
//! Finds lines whose first non-blank byte is `#` and buffers them up to the newline.
//! `include` directives are expanded in place; every other directive is written back
//! unchanged apart from collapsed blanks.

use async_trait::async_trait;

use super::context::PipelineContext;
use super::error::PreprocessError;
use super::include::{INCLUDE_KEYWORD, INCLUDE_NAME_OFFSET, include};
use super::stage::{Stage, StageInput, StageOutput};
use crate::data::channel::{ByteSink, ByteSource};

const STAGE: &str = "directives";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Only blanks seen on this line so far
    LineStart,
    /// After `#`, buffering until the newline
    InDirective,
    /// Ordinary text, copied through to the newline
    CopyRest,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DirectiveRewriter;

#[async_trait]
impl Stage for DirectiveRewriter {
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
        let result = rewrite_lines(&mut input, &mut output, ctx).await;
        output.close(result).await
    }
}

async fn rewrite_lines(
    input: &mut StageInput<'_>,
    output: &mut StageOutput<'_>,
    ctx: &PipelineContext,
) -> Result<(), PreprocessError> {
    let max_len = ctx.config().max_directive_len;
    let mut state = State::LineStart;
    let mut directive: Vec<u8> = Vec::new();

    while let Some(byte) = input.next_byte().await? {
        state = match state {
            State::LineStart => match byte {
                b'#' => {
                    directive.clear();
                    State::InDirective
                }
                b' ' | b'\t' | b'\n' => {
                    output.put(byte).await?;
                    State::LineStart
                }
                _ => {
                    output.put(byte).await?;
                    State::CopyRest
                }
            },

            State::InDirective if byte == b'\n' => {
                dispatch(&directive, output, ctx).await?;
                output.put(b'\n').await?;
                State::LineStart
            }
            State::InDirective => {
                let byte = if byte == b'\t' { b' ' } else { byte };
                if byte == b' ' && directive.last() == Some(&b' ') {
                    continue;
                }
                if directive.len() >= max_len {
                    let overflow = PreprocessError::BufferOverflow { max: max_len };
                    return Err(ctx.report(STAGE, overflow));
                }
                directive.push(byte);
                State::InDirective
            }

            State::CopyRest => {
                output.put(byte).await?;
                if byte == b'\n' {
                    State::LineStart
                } else {
                    State::CopyRest
                }
            }
        };
    }

    if state == State::InDirective {
        tracing::debug!("Directive without trailing newline at end of input");
        dispatch(&directive, output, ctx).await?;
    }
    Ok(())
}

async fn dispatch(
    directive: &[u8],
    output: &mut StageOutput<'_>,
    ctx: &PipelineContext,
) -> Result<(), PreprocessError> {
    if directive.starts_with(INCLUDE_KEYWORD) {
        tracing::trace!(directive = %String::from_utf8_lossy(directive), "Include directive");
        include(directive, INCLUDE_NAME_OFFSET, output.sink_mut(), ctx).await
    } else {
        tracing::trace!(
            directive = %String::from_utf8_lossy(directive),
            "Passing directive through"
        );
        output.put(b'#').await?;
        output.put_all(directive).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PreprocessConfig;
    use crate::data::files::MemoryOpener;
    use crate::domain::preprocess::testing::{run_stage, run_stage_in, run_stage_with};

    async fn rewrite(input: &[u8]) -> Vec<u8> {
        let (out, result) = run_stage(DirectiveRewriter, input).await;
        result.unwrap();
        out
    }

    #[tokio::test]
    async fn test_plain_text_unchanged() {
        let text = b"int a;\n  int b; # not a directive\n\n";
        assert_eq!(rewrite(text).await, text);
    }

    #[tokio::test]
    async fn test_define_passes_through() {
        assert_eq!(rewrite(b"#define FOO 1\n").await, b"#define FOO 1\n");
    }

    #[tokio::test]
    async fn test_blanks_collapse_inside_directive() {
        assert_eq!(
            rewrite(b"  #define\tFOO   \t 1\nx\n").await,
            b"  #define FOO 1\nx\n"
        );
    }

    #[tokio::test]
    async fn test_blank_after_hash_is_kept() {
        // Only `#include` directly after the hash names an include.
        assert_eq!(
            rewrite(b"#  include \"a.h\"\n").await,
            b"# include \"a.h\"\n"
        );
    }

    #[tokio::test]
    async fn test_directive_at_end_without_newline() {
        assert_eq!(rewrite(b"x\n#pragma once").await, b"x\n#pragma once");
    }

    #[tokio::test]
    async fn test_include_is_expanded() {
        let opener = MemoryOpener::new().with_file("a.h", "X");
        let (out, result, diagnostics) = run_stage_in(
            DirectiveRewriter,
            b"1\n#include \"a.h\"\n2\n",
            PreprocessConfig::default(),
            opener,
        )
        .await;
        result.unwrap();
        assert_eq!(out, b"1\nX\n2\n");
        assert!(diagnostics.entries().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_include_keeps_lines_before_it() {
        let (out, result, diagnostics) = run_stage_in(
            DirectiveRewriter,
            b"before\n#include \"a.h\nafter\n",
            PreprocessConfig::default(),
            MemoryOpener::new(),
        )
        .await;

        assert!(matches!(result, Err(PreprocessError::MalformedInclude { .. })));
        // Lines ahead of the directive are delivered, nothing after it
        assert_eq!(out, b"before\n");
        assert_eq!(diagnostics.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_directive_overflow() {
        let config = PreprocessConfig {
            max_directive_len: 8,
            ..PreprocessConfig::default()
        };
        let (_, result) =
            run_stage_with(DirectiveRewriter, b"#define LONG_NAME 1\n", config).await;
        assert!(matches!(result, Err(PreprocessError::BufferOverflow { max: 8 })));
    }

    #[tokio::test]
    async fn test_overflow_keeps_completed_lines() {
        let config = PreprocessConfig {
            max_directive_len: 8,
            ..PreprocessConfig::default()
        };
        let (out, result) =
            run_stage_with(DirectiveRewriter, b"int a;\n#define X\n#define LONG_NAME 1\n", config)
                .await;
        assert!(matches!(result, Err(PreprocessError::BufferOverflow { .. })));
        assert_eq!(out, b"int a;\n#define X\n");
    }

    #[tokio::test]
    async fn test_directive_at_limit_fits() {
        let config = PreprocessConfig {
            max_directive_len: 8,
            ..PreprocessConfig::default()
        };
        let (out, result) = run_stage_with(DirectiveRewriter, b"#define X\n", config).await;
        result.unwrap();
        assert_eq!(out, b"#define X\n");
    }
}
