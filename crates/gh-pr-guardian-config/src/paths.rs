//! Data directory paths
//!
//! Uses XDG directories via `dirs` crate with fallbacks.
//!
//! Platform-specific locations:
//! - Linux: `~/.cache/gh-pr-guardian/`
//! - macOS: `~/Library/Caches/gh-pr-guardian/`
//! - Windows: `%LOCALAPPDATA%\gh-pr-guardian\`

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_NAME: &str = "gh-pr-guardian";

/// Get the application cache directory, creating it if needed
pub fn cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("Could not determine cache directory")?;
    let dir = base.join(APP_NAME);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create cache directory {:?}", dir))?;
    Ok(dir)
}

/// Get path to the label expiry ledger of a repository
///
/// One file per repository so several projects can share a runner.
pub fn ledger_path(owner: &str, repo: &str) -> Result<PathBuf> {
    Ok(cache_dir()?.join(ledger_file_name(owner, repo)))
}

fn ledger_file_name(owner: &str, repo: &str) -> String {
    format!("ledger-{}-{}.toml", owner, repo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_file_name() {
        assert_eq!(
            ledger_file_name("sassman", "gh-pr-guardian"),
            "ledger-sassman-gh-pr-guardian.toml"
        );
    }
}
