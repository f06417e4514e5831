//! Default paths for parkgate components
//!
//! Paths are user-writable by default (no root required):
//! - Config: `$XDG_CONFIG_HOME/parkgate/config.toml` or `~/.config/parkgate/config.toml`
//! - Data: `$XDG_DATA_HOME/parkgate` or `~/.local/share/parkgate`

use std::path::PathBuf;

/// Environment variable for overriding the config file path
pub const PARKGATE_CONFIG_ENV: &str = "PARKGATE_CONFIG";

/// Environment variable for overriding the data directory
pub const PARKGATE_DATA_DIR_ENV: &str = "PARKGATE_DATA_DIR";

/// Environment variable naming the acting tenant
pub const PARKGATE_TENANT_ENV: &str = "PARKGATE_TENANT";

/// Application subdirectory name
const APP_DIR: &str = "parkgate";

/// Database filename within the data directory
const DATABASE_FILENAME: &str = "parkgate.db";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$XDG_CONFIG_HOME/parkgate/config.toml`
/// 2. `~/.config/parkgate/config.toml`
/// 3. `/etc/parkgate/config.toml`
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join("config.toml");
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml");
    }

    PathBuf::from("/etc").join(APP_DIR).join("config.toml")
}

/// Get the default data directory.
///
/// `$PARKGATE_DATA_DIR` is not consulted here; the binary reads it through
/// its `--data-dir` argument, which overrides the configured directory.
///
/// Order of precedence:
/// 1. `$XDG_DATA_HOME/parkgate` (if XDG_DATA_HOME is set)
/// 2. `~/.local/share/parkgate` (fallback)
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Path of the SQLite database inside a data directory
pub fn database_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join(DATABASE_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_toml_under_app_dir() {
        let path = default_config_path();
        assert!(path.to_string_lossy().contains("parkgate"));
        assert_eq!(path.extension().unwrap(), "toml");
    }

    #[test]
    fn data_dir_contains_parkgate() {
        let path = data_dir_without_env();
        assert!(path.to_string_lossy().contains("parkgate"));
    }

    #[test]
    fn database_lives_in_data_dir() {
        let dir = PathBuf::from("/var/lib/parkgate");
        assert_eq!(database_path(&dir), PathBuf::from("/var/lib/parkgate/parkgate.db"));
    }
}
