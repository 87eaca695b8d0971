//! Includer
//!
//! Resolves the quoted name of an `include` directive, opens it and splices the
//! fully preprocessed contents into the enclosing output by running a nested
//! pipeline over it.

use std::io;
use std::path::{Path, PathBuf};

use super::context::PipelineContext;
use super::error::PreprocessError;
use super::pipeline::Pipeline;
use crate::data::channel::ByteSink;
use crate::data::files::{FileOpenError, OpenedSource};

const STAGE: &str = "includer";

/// Directive keyword, as it appears in the buffer after `#`
pub const INCLUDE_KEYWORD: &[u8] = b"include";

/// Position just past the keyword and the byte following it
pub const INCLUDE_NAME_OFFSET: usize = INCLUDE_KEYWORD.len() + 1;

const QUOTE: u8 = b'"';

/// Extract the name between the first pair of quotes at or after `offset`.
pub fn parse_include_name(directive: &[u8], offset: usize) -> Result<&str, PreprocessError> {
    let malformed = || PreprocessError::MalformedInclude {
        directive: format!("#{}", String::from_utf8_lossy(directive)),
    };

    let rest = directive.get(offset..).ok_or_else(malformed)?;
    let start = rest.iter().position(|&b| b == QUOTE).ok_or_else(malformed)?;
    let name = &rest[start + 1..];
    let end = name.iter().position(|&b| b == QUOTE).ok_or_else(malformed)?;

    std::str::from_utf8(&name[..end]).map_err(|_| malformed())
}

/// Paths tried for `name`, in order, without duplicates.
pub fn include_candidates(name: &str, ctx: &PipelineContext) -> Vec<PathBuf> {
    let requested = Path::new(name);
    if requested.is_absolute() {
        return vec![requested.to_path_buf()];
    }

    let mut candidates: Vec<PathBuf> = Vec::new();
    let mut push = |path: PathBuf| {
        if !candidates.contains(&path) {
            candidates.push(path);
        }
    };

    if let Some(dir) = ctx.base_dir() {
        push(dir.join(requested));
    }
    for dir in &ctx.config().include_dirs {
        push(dir.join(requested));
    }
    push(requested.to_path_buf());

    candidates
}

/// Expand the include directive held in `directive` into `sink`.
///
/// Failures detected here are reported against the includer. Failures inside the
/// nested pipeline were already reported by the stage that hit them.
pub async fn include(
    directive: &[u8],
    offset: usize,
    sink: &mut ByteSink,
    ctx: &PipelineContext,
) -> Result<(), PreprocessError> {
    let name = parse_include_name(directive, offset).map_err(|e| ctx.report(STAGE, e))?;
    let opened = open_first(name, ctx).await.map_err(|e| ctx.report(STAGE, e))?;

    if ctx.include_stack().contains(&opened.identity) {
        return Err(ctx.report(
            STAGE,
            PreprocessError::CyclicInclude {
                path: opened.identity,
            },
        ));
    }

    tracing::debug!(
        name,
        identity = %opened.identity.display(),
        depth = ctx.depth() + 1,
        "Expanding include"
    );

    let nested = Pipeline::standard(ctx.entered(&opened.source, &opened.identity));
    nested.run(opened.source, sink).await
}

async fn open_first(name: &str, ctx: &PipelineContext) -> Result<OpenedSource, PreprocessError> {
    let mut last_error = None;
    for candidate in include_candidates(name, ctx) {
        match ctx.opener().open_read(&candidate).await {
            Ok(opened) => return Ok(opened),
            Err(e) => {
                tracing::trace!(
                    candidate = %candidate.display(),
                    error = %e,
                    "Include candidate rejected"
                );
                last_error = Some(e);
            }
        }
    }

    let source = last_error.unwrap_or_else(|| {
        FileOpenError::from_io(Path::new(name), io::ErrorKind::NotFound.into())
    });
    Err(PreprocessError::IncludeNotFound {
        name: name.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PreprocessConfig;
    use crate::data::channel::ByteSource;
    use crate::data::files::MemoryOpener;
    use crate::domain::preprocess::testing::{collect, context_with};
    use std::sync::Arc;

    #[test]
    fn test_parse_basic_name() {
        assert_eq!(parse_include_name(b"include \"a.h\"", 8).unwrap(), "a.h");
    }

    #[test]
    fn test_parse_ignores_trailing_text() {
        let name = parse_include_name(b"include \"dir/b.h\" trailing \"x\"", 8).unwrap();
        assert_eq!(name, "dir/b.h");
    }

    #[test]
    fn test_parse_missing_closing_quote() {
        let err = parse_include_name(b"include \"a.h", 8).unwrap_err();
        assert!(matches!(err, PreprocessError::MalformedInclude { .. }));
        assert!(err.to_string().contains("#include \"a.h"));
    }

    #[test]
    fn test_parse_missing_quotes_entirely() {
        assert!(parse_include_name(b"include <stdio.h>", 8).is_err());
        assert!(parse_include_name(b"include", 8).is_err());
    }

    #[test]
    fn test_parse_quote_at_offset_is_skipped() {
        // Without a separating blank the opening quote sits under the offset.
        assert!(parse_include_name(b"include\"a.h\"", 8).is_err());
    }

    #[test]
    fn test_candidates_order_and_dedup() {
        let config = PreprocessConfig {
            include_dirs: vec![PathBuf::from("inc"), PathBuf::from("src")],
            ..PreprocessConfig::default()
        };
        let root = context_with(config, MemoryOpener::new()).0;
        let source = ByteSource::from_path(Path::new("src/main.c"), &b""[..]);
        let ctx = root.entered(&source, Path::new("src/main.c"));

        assert_eq!(
            include_candidates("a.h", &ctx),
            vec![
                PathBuf::from("src/a.h"),
                PathBuf::from("inc/a.h"),
                PathBuf::from("a.h"),
            ]
        );
        assert_eq!(
            include_candidates("/abs/a.h", &ctx),
            vec![PathBuf::from("/abs/a.h")]
        );
    }

    #[tokio::test]
    async fn test_include_splices_nested_contents() {
        let opener = MemoryOpener::new()
            .with_file("a.h", "A /* c */\n#include \"b.h\"\n")
            .with_file("b.h", "B\\\n2\n");
        let (ctx, diagnostics) = context_with(PreprocessConfig::default(), opener);

        let (mut sink, out) = crate::data::channel::channel("out", 1024);
        let reader = tokio::spawn(collect(out));
        include(b"include \"a.h\"", INCLUDE_NAME_OFFSET, &mut sink, &ctx)
            .await
            .unwrap();
        sink.finish().await.unwrap();

        assert_eq!(reader.await.unwrap(), b"A  \nB2\n\n");
        assert!(diagnostics.entries().is_empty());
    }

    #[tokio::test]
    async fn test_include_not_found_reported_once() {
        let (ctx, diagnostics) = context_with(PreprocessConfig::default(), MemoryOpener::new());
        let (mut sink, _out) = crate::data::channel::channel("out", 64);

        let err = include(b"include \"missing.h\"", 8, &mut sink, &ctx)
            .await
            .unwrap_err();
        assert!(
            matches!(err, PreprocessError::IncludeNotFound { ref name, .. } if name == "missing.h")
        );
        assert_eq!(diagnostics.entries().len(), 1);
        assert_eq!(diagnostics.entries()[0].stage, "includer");
    }

    #[tokio::test]
    async fn test_include_found_through_include_dir() {
        let opener = Arc::new(MemoryOpener::new().with_file("inc/x.h", "X\n"));
        let config = PreprocessConfig {
            include_dirs: vec![PathBuf::from("inc")],
            ..PreprocessConfig::default()
        };
        let (ctx, _) = context_with(config, opener.clone());

        let (mut sink, out) = crate::data::channel::channel("out", 64);
        let reader = tokio::spawn(collect(out));
        include(b"include \"x.h\"", 8, &mut sink, &ctx).await.unwrap();
        sink.finish().await.unwrap();

        assert_eq!(reader.await.unwrap(), b"X\n");
        assert_eq!(opener.opened(), vec![PathBuf::from("inc/x.h")]);
    }

    #[tokio::test]
    async fn test_self_include_is_cyclic() {
        let opener = MemoryOpener::new().with_file("loop.h", "#include \"loop.h\"\n");
        let (ctx, diagnostics) = context_with(PreprocessConfig::default(), opener);
        let (mut sink, _out) = crate::data::channel::channel("out", 64);

        let err = include(b"include \"loop.h\"", 8, &mut sink, &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, PreprocessError::CyclicInclude { .. }));
        assert_eq!(diagnostics.entries().len(), 1);
        assert_eq!(diagnostics.entries()[0].kind, "cyclic_include");
    }
}
