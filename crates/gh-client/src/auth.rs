//! Token resolution and client construction
//!
//! Builds an authenticated [`OctocrabClient`] for github.com or a GitHub
//! Enterprise host.

use crate::{OctocrabClient, DEFAULT_HOST};
use anyhow::{Context, Result};
use log::{debug, info};
use octocrab::Octocrab;
use std::sync::Arc;

/// Resolves the API token for a host
///
/// Sources, first match wins:
/// 1. `GITHUB_TOKEN_<HOST>` (e.g. `GITHUB_TOKEN_GHE_EXAMPLE_COM`)
/// 2. `GITHUB_TOKEN` or `GH_TOKEN`, for github.com only
/// 3. `gh auth token --hostname <host>`
#[derive(Debug, Clone, Default)]
pub struct TokenResolver {
    /// Generic token from GITHUB_TOKEN/GH_TOKEN
    generic_token: Option<String>,
}

impl TokenResolver {
    /// Resolver reading the generic token from the environment
    pub fn new() -> Self {
        Self {
            generic_token: non_empty_env("GITHUB_TOKEN").or_else(|| non_empty_env("GH_TOKEN")),
        }
    }

    /// Name of the host-specific token variable
    pub fn host_env_key(host: &str) -> String {
        format!(
            "GITHUB_TOKEN_{}",
            host.replace(['.', '-'], "_").to_uppercase()
        )
    }

    /// Token for `host` (None = github.com)
    pub async fn resolve(&self, host: Option<&str>) -> Result<String> {
        let host = host.unwrap_or(DEFAULT_HOST);
        let env_key = Self::host_env_key(host);

        if let Some(token) = non_empty_env(&env_key) {
            debug!("Using token from {} for {}", env_key, host);
            return Ok(token);
        }

        if host == DEFAULT_HOST {
            if let Some(token) = &self.generic_token {
                debug!("Using GITHUB_TOKEN/GH_TOKEN for {}", host);
                return Ok(token.clone());
            }
        }

        if let Some(token) = gh_cli_token(host).await? {
            debug!("Using token from gh CLI for {}", host);
            return Ok(token);
        }

        anyhow::bail!(
            "No token found for host '{}'. Set {} (or GITHUB_TOKEN) or run 'gh auth login --hostname {}'",
            host,
            env_key,
            host
        )
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Ask the gh CLI; a missing binary or a failed login yields None
async fn gh_cli_token(host: &str) -> Result<Option<String>> {
    let Ok(output) = tokio::process::Command::new("gh")
        .args(["auth", "token", "--hostname", host])
        .output()
        .await
    else {
        debug!("gh CLI not available");
        return Ok(None);
    };

    if !output.status.success() {
        return Ok(None);
    }

    let token = String::from_utf8(output.stdout).context("Invalid UTF-8 in gh auth token output")?;
    let token = token.trim();
    Ok((!token.is_empty()).then(|| token.to_string()))
}

/// Base URI of the REST API for a host
pub fn api_base_uri(host: &str) -> String {
    if host == DEFAULT_HOST {
        "https://api.github.com".to_string()
    } else {
        format!("https://{}/api/v3", host)
    }
}

/// Build an authenticated client for the given host
pub async fn connect(host: Option<&str>) -> Result<OctocrabClient> {
    let effective_host = host.unwrap_or(DEFAULT_HOST);
    info!("Creating GitHub client for host: {}", effective_host);

    let token = TokenResolver::new().resolve(host).await?;

    let mut builder = Octocrab::builder().personal_token(token);
    if effective_host != DEFAULT_HOST {
        builder = builder
            .base_uri(api_base_uri(effective_host))
            .context("Failed to set base URI")?;
    }

    let octocrab = builder.build().context("Failed to build Octocrab client")?;
    Ok(OctocrabClient::new(Arc::new(octocrab)))
}
