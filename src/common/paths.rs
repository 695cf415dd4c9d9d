//! Configuration paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/rest-api-tests/`
//! - macOS: `~/Library/Application Support/rest-api-tests/`
//! - Windows: `%APPDATA%\rest-api-tests\`

use std::path::{Path, PathBuf};

/// Application name used for config lookups
const APP_NAME: &str = "rest-api-tests";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Render a relative path with `/` separators regardless of platform
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_is_toml() {
        if let Some(path) = config_path() {
            assert_eq!(path.file_name().unwrap(), "config.toml");
        }
    }

    #[test]
    fn test_to_slash() {
        let path = Path::new("search").join("bool").join("match.yaml");
        assert_eq!(to_slash(&path), "search/bool/match.yaml");
    }
}
