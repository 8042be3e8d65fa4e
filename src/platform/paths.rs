// tabpilot platform paths
// Linux:   $XDG_CONFIG_HOME/tabpilot, $XDG_DATA_HOME/tabpilot
// macOS:   ~/Library/Application Support/tabpilot
// Windows: %APPDATA%/tabpilot

use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "tabpilot";

/// Overrides [`get_data_dir`] when set.
pub const DATA_DIR_ENV: &str = "TABPILOT_DATA_DIR";

fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

/// Returns the platform-specific configuration directory.
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        match env::var("XDG_CONFIG_HOME") {
            Ok(xdg) => PathBuf::from(xdg).join(APP_DIR),
            Err(_) => home_dir().join(".config").join(APP_DIR),
        }
    }
    #[cfg(target_os = "macos")]
    {
        home_dir()
            .join("Library")
            .join("Application Support")
            .join(APP_DIR)
    }
    #[cfg(target_os = "windows")]
    {
        match env::var("APPDATA") {
            Ok(appdata) => PathBuf::from(appdata).join(APP_DIR),
            Err(_) => home_dir().join("AppData").join("Roaming").join(APP_DIR),
        }
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        home_dir().join(".config").join(APP_DIR)
    }
}

/// Returns the directory holding the record database.
///
/// `TABPILOT_DATA_DIR` wins over the platform default.
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    #[cfg(target_os = "linux")]
    {
        match env::var("XDG_DATA_HOME") {
            Ok(xdg) => PathBuf::from(xdg).join(APP_DIR),
            Err(_) => home_dir().join(".local").join("share").join(APP_DIR),
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        get_config_dir()
    }
}

/// Full path of the record database.
pub fn get_database_path() -> PathBuf {
    get_data_dir().join("tabpilot.db")
}
