//! Stage 2: comment replacement
//!
//! `//` and `/*` comments turn into a single space so that tokens on either side
//! stay separated. For a line comment the space merges with a blank directly before
//! it, so `a // c` becomes `a `. Newlines inside a block comment are kept by default,
//! so line numbers after it still line up.
//!
//! ```text
//!            '/'              '/'
//!  Normal ─────────▶ SawSlash ─────▶ LineComment ──'\n'──▶ Normal
//!                       │ '*'
//!                       ▼        '*'                  '/'
//!                  BlockComment ─────▶ BlockCommentStar ─────▶ Normal
//!                       ▲                    │ other
//!                       └────────────────────┘
//! ```

use async_trait::async_trait;

use super::context::PipelineContext;
use super::error::PreprocessError;
use super::stage::{Stage, StageInput, StageOutput};
use crate::data::channel::{ByteSink, ByteSource};

const STAGE: &str = "comments";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    SawSlash,
    LineComment,
    BlockComment,
    BlockCommentStar,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CommentStripper;

#[async_trait]
impl Stage for CommentStripper {
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
        let result = strip_comments(&mut input, &mut output, ctx).await;
        output.close(result).await
    }
}

async fn strip_comments(
    input: &mut StageInput<'_>,
    output: &mut StageOutput<'_>,
    ctx: &PipelineContext,
) -> Result<(), PreprocessError> {
    let keep_newlines = ctx.config().preserve_comment_newlines;
    let mut state = State::Normal;
    // Last byte emitted was a space or tab
    let mut after_blank = false;

    while let Some(byte) = input.next_byte().await? {
        state = match (state, byte) {
            (State::Normal, b'/') => State::SawSlash,
            (State::Normal, _) => {
                output.put(byte).await?;
                after_blank = is_blank(byte);
                State::Normal
            }

            // A line comment reuses a blank right before it; a block comment always
            // leaves its own space.
            (State::SawSlash, b'/') => {
                if !after_blank {
                    output.put(b' ').await?;
                    after_blank = true;
                }
                State::LineComment
            }
            (State::SawSlash, b'*') => {
                output.put(b' ').await?;
                after_blank = true;
                State::BlockComment
            }
            // Not a comment after all: release the slash, then this byte as Normal.
            (State::SawSlash, _) => {
                output.put_all(&[b'/', byte]).await?;
                after_blank = is_blank(byte);
                State::Normal
            }

            (State::LineComment, b'\n') => {
                output.put(b'\n').await?;
                after_blank = false;
                State::Normal
            }
            (State::LineComment, _) => State::LineComment,

            (State::BlockComment | State::BlockCommentStar, b'\n') => {
                if keep_newlines {
                    output.put(b'\n').await?;
                    after_blank = false;
                }
                State::BlockComment
            }
            (State::BlockComment, b'*') => State::BlockCommentStar,
            (State::BlockComment, _) => State::BlockComment,
            (State::BlockCommentStar, b'/') => State::Normal,
            (State::BlockCommentStar, b'*') => State::BlockCommentStar,
            (State::BlockCommentStar, _) => State::BlockComment,
        };
    }

    match state {
        State::SawSlash => output.put(b'/').await,
        State::BlockComment | State::BlockCommentStar => {
            if ctx.config().strict_comments {
                return Err(ctx.report(STAGE, PreprocessError::UnterminatedComment));
            }
            tracing::debug!("Block comment still open at end of input");
            Ok(())
        }
        State::Normal | State::LineComment => Ok(()),
    }
}

fn is_blank(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t')
}
