use clap::Parser;

use std::path::PathBuf;

use super::constants::{
    ENV_CHANNEL_CAPACITY, ENV_CONFIG, ENV_INCLUDE_DIRS, ENV_MAX_DIRECTIVE_LEN,
    ENV_STRICT_COMMENTS,
};

#[derive(Parser, Debug)]
#[command(name = "bscpp")]
#[command(
    version,
    about = "Join continuations, strip comments and expand #include \"file\" directives",
    long_about = None
)]
pub struct Cli {
    /// Source file to preprocess
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// File to write the expanded output to (created or truncated)
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Path to config file
    #[arg(long, short = 'c', env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Extra directory to search for included files (repeatable)
    #[arg(
        long = "include-dir",
        short = 'I',
        value_name = "DIR",
        env = ENV_INCLUDE_DIRS,
        value_delimiter = ':'
    )]
    pub include_dirs: Vec<PathBuf>,

    /// Longest directive line accepted, in bytes
    #[arg(long, env = ENV_MAX_DIRECTIVE_LEN)]
    pub max_directive_len: Option<usize>,

    /// Bytes buffered between two stages
    #[arg(long, env = ENV_CHANNEL_CAPACITY)]
    pub channel_capacity: Option<usize>,

    /// Fail on a block comment still open at end of input
    #[arg(long, env = ENV_STRICT_COMMENTS)]
    pub strict_comments: bool,

    /// Drop newlines inside block comments instead of keeping them
    #[arg(long)]
    pub no_comment_newlines: bool,

    /// Permission bits for the output file, in octal (e.g. 644)
    #[arg(long, value_parser = parse_octal_mode)]
    pub output_mode: Option<u32>,
}

pub(crate) fn parse_octal_mode(s: &str) -> Result<u32, String> {
    let digits = s.strip_prefix("0o").unwrap_or(s);
    let mode = u32::from_str_radix(digits, 8)
        .map_err(|_| format!("Invalid octal mode '{s}'. Expected e.g. 644 or 0o664"))?;
    if mode > 0o7777 {
        return Err(format!("Mode '{s}' is out of range (max 7777)"));
    }
    Ok(mode)
}

/// CLI options that feed into config loading
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub config: Option<PathBuf>,
    pub include_dirs: Vec<PathBuf>,
    pub max_directive_len: Option<usize>,
    pub channel_capacity: Option<usize>,
    pub strict_comments: bool,
    pub no_comment_newlines: bool,
    pub output_mode: Option<u32>,
}

impl From<Cli> for CliConfig {
    fn from(cli: Cli) -> Self {
        Self {
            input: cli.input,
            output: cli.output,
            config: cli.config,
            include_dirs: cli.include_dirs,
            max_directive_len: cli.max_directive_len,
            channel_capacity: cli.channel_capacity,
            strict_comments: cli.strict_comments,
            no_comment_newlines: cli.no_comment_newlines,
            output_mode: cli.output_mode,
        }
    }
}

/// Parse CLI arguments, exiting with usage on error
pub fn parse() -> CliConfig {
    Cli::parse().into()
}
