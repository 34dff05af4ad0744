use std::{env, path::PathBuf};

const CONFIG_FILE: &str = ".gh-pr-guardian.toml";

/// Load config file content from CWD first, then home directory
///
/// Searches for .gh-pr-guardian.toml in:
/// 1. Current working directory
/// 2. Home directory
///
/// Returns the file content if found, None otherwise.
pub fn load_config_file() -> Option<String> {
    if let Ok(content) = std::fs::read_to_string(CONFIG_FILE) {
        log::debug!("Loaded config from {}", CONFIG_FILE);
        return Some(content);
    }

    if let Some(home_config) = get_home_config_path() {
        if let Ok(content) = std::fs::read_to_string(&home_config) {
            log::debug!("Loaded config from {}", home_config.display());
            return Some(content);
        }
    }

    None
}

/// Load variables from a `.env` file in the working directory, if any
///
/// Variables already present in the environment are left untouched.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => log::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("Failed to load .env file: {}", e),
    }
}

/// Returns ~/.gh-pr-guardian.toml if HOME environment variable is set.
fn get_home_config_path() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| PathBuf::from(home).join(CONFIG_FILE))
}
