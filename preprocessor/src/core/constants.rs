// =============================================================================
// Application Identity
// =============================================================================

/// Application name (binary name, config file stem)
pub const APP_NAME: &str = "bscpp";

/// Unix-style dotfile folder name for the profile config
pub const APP_DOT_FOLDER: &str = ".bscpp";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name, looked up in the profile folder and the working directory
pub const CONFIG_FILE_NAME: &str = "bscpp.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "BSCPP_CONFIG";

// =============================================================================
// Environment Variables - Logging
// =============================================================================

/// Environment variable for log level/filter (falls back to RUST_LOG)
pub const ENV_LOG: &str = "BSCPP_LOG";

/// Filter used when neither log variable is set
pub const DEFAULT_LOG_FILTER: &str = "warn";

// =============================================================================
// Environment Variables - Preprocessing
// =============================================================================

/// Environment variable for extra include directories (colon separated)
pub const ENV_INCLUDE_DIRS: &str = "BSCPP_INCLUDE_DIRS";

/// Environment variable for the directive length limit
pub const ENV_MAX_DIRECTIVE_LEN: &str = "BSCPP_MAX_DIRECTIVE_LEN";

/// Environment variable for the stage channel capacity
pub const ENV_CHANNEL_CAPACITY: &str = "BSCPP_CHANNEL_CAPACITY";

/// Environment variable to reject unterminated block comments
pub const ENV_STRICT_COMMENTS: &str = "BSCPP_STRICT_COMMENTS";

// =============================================================================
// Preprocessing Defaults
// =============================================================================

/// Longest path the directive buffer is sized for (Linux `PATH_MAX`)
pub const PATH_MAX: usize = 4096;

/// Default directive buffer limit: room for two paths plus the directive itself
pub const DEFAULT_MAX_DIRECTIVE_LEN: usize = 1000 + 2 * PATH_MAX;

/// Default bytes in flight between two stages
pub const DEFAULT_CHANNEL_CAPACITY: usize = 8 * 1024;

/// Default permission bits for the output file
pub const DEFAULT_OUTPUT_MODE: u32 = 0o664;

// =============================================================================
// Exit Codes
// =============================================================================

/// Generic failure, used when an internal code does not fit an exit status
pub const EXIT_GENERIC_FAILURE: u8 = 1;

/// Exit statuses at or above this are read by shells as signal terminations
pub const EXIT_SIGNAL_BASE: i32 = 128;

/// Configuration or usage error (sysexits `EX_CONFIG`)
pub const EXIT_CONFIG: u8 = 78;
