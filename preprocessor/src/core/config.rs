use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::utils::path::{expand_home, profile_config_path};

use super::cli::{CliConfig, parse_octal_mode};
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_DIRECTIVE_LEN,
    DEFAULT_OUTPUT_MODE,
};

// =============================================================================
// File Configuration
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct PreprocessFileConfig {
    pub max_directive_len: Option<usize>,
    pub channel_capacity: Option<usize>,
    pub include_dirs: Option<Vec<PathBuf>>,
    pub preserve_comment_newlines: Option<bool>,
    pub strict_comments: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OutputFileConfig {
    /// Octal permission bits as a string, e.g. `"644"`
    pub mode: Option<String>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub preprocess: Option<PreprocessFileConfig>,
    pub output: Option<OutputFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(preprocess) = other.preprocess {
            let current = self
                .preprocess
                .get_or_insert_with(PreprocessFileConfig::default);
            if preprocess.max_directive_len.is_some() {
                current.max_directive_len = preprocess.max_directive_len;
            }
            if preprocess.channel_capacity.is_some() {
                current.channel_capacity = preprocess.channel_capacity;
            }
            if preprocess.include_dirs.is_some() {
                tracing::trace!(dirs = ?preprocess.include_dirs, "Merging preprocess.include_dirs");
                current.include_dirs = preprocess.include_dirs;
            }
            if preprocess.preserve_comment_newlines.is_some() {
                current.preserve_comment_newlines = preprocess.preserve_comment_newlines;
            }
            if preprocess.strict_comments.is_some() {
                current.strict_comments = preprocess.strict_comments;
            }
        }

        if let Some(output) = other.output {
            let current = self.output.get_or_insert_with(OutputFileConfig::default);
            if output.mode.is_some() {
                current.mode = output.mode;
            }
        }
    }
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Settings every pipeline stage can see
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessConfig {
    /// Longest directive accepted by the directive buffer, in bytes
    pub max_directive_len: usize,
    /// Bytes in flight between two stages
    pub channel_capacity: usize,
    /// Searched after the including file's directory, in order
    pub include_dirs: Vec<PathBuf>,
    /// Keep newlines found inside block comments
    pub preserve_comment_newlines: bool,
    /// Fail on a block comment still open at end of input
    pub strict_comments: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            max_directive_len: DEFAULT_MAX_DIRECTIVE_LEN,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            include_dirs: Vec::new(),
            preserve_comment_newlines: true,
            strict_comments: false,
        }
    }
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub output_mode: u32,
    pub preprocess: PreprocessConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.bscpp/bscpp.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = profile_config_path(APP_DOT_FOLDER, CONFIG_FILE_NAME)
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_home(path);
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        Self::from_layers(cli, file_config)
    }

    /// Layer CLI values over file values over defaults, then validate.
    fn from_layers(cli: &CliConfig, file_config: FileConfig) -> Result<Self> {
        let file_preprocess = file_config.preprocess.unwrap_or_default();
        let file_output = file_config.output.unwrap_or_default();
        let defaults = PreprocessConfig::default();

        // CLI directories are searched before the ones from config files
        let include_dirs = cli
            .include_dirs
            .iter()
            .cloned()
            .chain(
                file_preprocess
                    .include_dirs
                    .unwrap_or_default()
                    .into_iter()
                    .map(|dir| expand_home(&dir)),
            )
            .collect();

        let preserve_comment_newlines = if cli.no_comment_newlines {
            false
        } else {
            file_preprocess
                .preserve_comment_newlines
                .unwrap_or(defaults.preserve_comment_newlines)
        };

        let strict_comments = cli.strict_comments
            || file_preprocess
                .strict_comments
                .unwrap_or(defaults.strict_comments);

        let file_mode = file_output
            .mode
            .as_deref()
            .map(parse_octal_mode)
            .transpose()
            .map_err(|e| anyhow::anyhow!("Configuration error: output.mode: {e}"))?;

        let config = Self {
            input: cli.input.clone(),
            output: cli.output.clone(),
            output_mode: cli.output_mode.or(file_mode).unwrap_or(DEFAULT_OUTPUT_MODE),
            preprocess: PreprocessConfig {
                max_directive_len: cli
                    .max_directive_len
                    .or(file_preprocess.max_directive_len)
                    .unwrap_or(defaults.max_directive_len),
                channel_capacity: cli
                    .channel_capacity
                    .or(file_preprocess.channel_capacity)
                    .unwrap_or(defaults.channel_capacity),
                include_dirs,
                preserve_comment_newlines,
                strict_comments,
            },
        };

        config.validate()?;
        tracing::debug!(config = ?config, "Configuration resolved");
        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.preprocess.max_directive_len == 0 {
            anyhow::bail!("Configuration error: preprocess.max_directive_len must be greater than 0");
        }
        if self.preprocess.channel_capacity == 0 {
            anyhow::bail!("Configuration error: preprocess.channel_capacity must be greater than 0");
        }

        // Opening the output truncates it before the input is read
        if self.input == self.output {
            anyhow::bail!(
                "Configuration error: input and output are the same file: {}",
                self.input.display()
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli(input: &str, output: &str) -> CliConfig {
        CliConfig {
            input: PathBuf::from(input),
            output: PathBuf::from(output),
            ..CliConfig::default()
        }
    }

    fn file(json: &str) -> FileConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_layers(&cli("a.c", "b.c"), FileConfig::default()).unwrap();
        assert_eq!(config.preprocess, PreprocessConfig::default());
        assert_eq!(config.preprocess.max_directive_len, 1000 + 2 * 4096);
        assert_eq!(config.output_mode, 0o664);
    }

    #[test]
    fn test_file_config_parse_full() {
        let config = file(
            r#"{
                "preprocess": {
                    "max_directive_len": 2048,
                    "channel_capacity": 64,
                    "include_dirs": ["inc", "vendor/include"],
                    "preserve_comment_newlines": false,
                    "strict_comments": true
                },
                "output": { "mode": "640" }
            }"#,
        );
        let resolved = AppConfig::from_layers(&cli("a.c", "b.c"), config).unwrap();

        assert_eq!(resolved.preprocess.max_directive_len, 2048);
        assert_eq!(resolved.preprocess.channel_capacity, 64);
        assert_eq!(
            resolved.preprocess.include_dirs,
            vec![PathBuf::from("inc"), PathBuf::from("vendor/include")]
        );
        assert!(!resolved.preprocess.preserve_comment_newlines);
        assert!(resolved.preprocess.strict_comments);
        assert_eq!(resolved.output_mode, 0o640);
    }

    #[test]
    fn test_unknown_fields_are_kept_aside() {
        let config = file(r#"{ "preproces": { "strict_comments": true } }"#);
        assert!(config.preprocess.is_none());
        assert!(config.extra.get("preproces").is_some());
        config.warn_unknown_fields();
    }

    #[test]
    fn test_merge_other_takes_precedence() {
        let mut base =
            file(r#"{ "preprocess": { "channel_capacity": 16, "strict_comments": true } }"#);
        base.merge(file(r#"{ "preprocess": { "channel_capacity": 32 } }"#));

        let preprocess = base.preprocess.unwrap();
        assert_eq!(preprocess.channel_capacity, Some(32));
        assert_eq!(preprocess.strict_comments, Some(true));
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut args = cli("a.c", "b.c");
        args.channel_capacity = Some(128);
        args.include_dirs = vec![PathBuf::from("cli_inc")];
        args.no_comment_newlines = true;
        args.output_mode = Some(0o600);

        let config = file(
            r#"{
                "preprocess": { "channel_capacity": 16, "include_dirs": ["file_inc"] },
                "output": { "mode": "644" }
            }"#,
        );
        let resolved = AppConfig::from_layers(&args, config).unwrap();

        assert_eq!(resolved.preprocess.channel_capacity, 128);
        assert_eq!(
            resolved.preprocess.include_dirs,
            vec![PathBuf::from("cli_inc"), PathBuf::from("file_inc")]
        );
        assert!(!resolved.preprocess.preserve_comment_newlines);
        assert_eq!(resolved.output_mode, 0o600);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut args = cli("a.c", "b.c");
        args.channel_capacity = Some(0);
        let err = AppConfig::from_layers(&args, FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("channel_capacity"));

        let config = file(r#"{ "preprocess": { "max_directive_len": 0 } }"#);
        let err = AppConfig::from_layers(&cli("a.c", "b.c"), config).unwrap_err();
        assert!(err.to_string().contains("max_directive_len"));
    }

    #[test]
    fn test_same_input_and_output_rejected() {
        let err = AppConfig::from_layers(&cli("a.c", "a.c"), FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("same file"));
    }

    #[test]
    fn test_bad_mode_in_file_rejected() {
        let config = file(r#"{ "output": { "mode": "rwx" } }"#);
        let err = AppConfig::from_layers(&cli("a.c", "b.c"), config).unwrap_err();
        assert!(err.to_string().contains("output.mode"));
    }

    #[test]
    fn test_load_from_explicit_config_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, r#"{{ "preprocess": {{ "channel_capacity": 99 }} }}"#).unwrap();

        let mut args = cli("a.c", "b.c");
        args.config = Some(tmp.path().to_path_buf());
        let config = AppConfig::load(&args).unwrap();
        assert_eq!(config.preprocess.channel_capacity, 99);
    }

    #[test]
    fn test_load_missing_config_file() {
        let mut args = cli("a.c", "b.c");
        args.config = Some(PathBuf::from("/nonexistent/bscpp.json"));
        let err = AppConfig::load(&args).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_invalid_json() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "{{ not json").unwrap();

        let mut args = cli("a.c", "b.c");
        args.config = Some(tmp.path().to_path_buf());
        let err = AppConfig::load(&args).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
