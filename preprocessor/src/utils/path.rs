//! Path helpers for user-supplied locations

use std::path::{Component, Path, PathBuf};

/// Expand a leading `~` to the home directory.
///
/// Config files and environment variables are not run through a shell, so a
/// `~/include` written there would otherwise be taken literally. Relative paths
/// stay relative; the include resolver anchors them itself.
///
/// ```ignore
/// expand_home(Path::new("~/inc"))  // -> /home/user/inc
/// expand_home(Path::new("inc"))    // -> inc
/// ```
pub fn expand_home(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match dirs::home_dir() {
            Some(home) => home.join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

/// Profile-level config file, `~/.bscpp/bscpp.json`.
pub fn profile_config_path(dot_folder: &str, file_name: &str) -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(dot_folder).join(file_name))
}
