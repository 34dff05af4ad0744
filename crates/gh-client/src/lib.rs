//! GitHub API client for the pull request guardian
//!
//! This crate provides a trait-based GitHub API client. The guardian's
//! control loop only depends on the trait, so it can be driven by the
//! octocrab implementation in production and by fakes in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              GitHubClient trait                  │
//! │  - fetch_open_pull_requests()                    │
//! │  - fetch_check_runs() / rerun_check_run()        │
//! │  - update_pull_request_branch()                  │
//! │  - enable_auto_merge()                           │
//! │  - labels, comments, rate limit                  │
//! └─────────────────────────────────────────────────┘
//!                        │
//!                        ▼
//!              ┌─────────────────┐
//!              │ OctocrabClient  │
//!              │ (REST+GraphQL)  │
//!              └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use gh_client::GitHubClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = gh_client::connect(None).await?;
//! let prs = client.fetch_open_pull_requests("owner", "repo").await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod octocrab_client;
pub mod types;

/// Default GitHub host (public GitHub)
pub const DEFAULT_HOST: &str = "github.com";

pub use auth::{connect, TokenResolver};
pub use client::GitHubClient;
pub use error::{ApiOperation, HostingApiError, Result};
pub use octocrab_client::OctocrabClient;
pub use types::{
    BranchUpdateStrategy, CheckConclusion, CheckRun, CheckRunStatus, LabelSpec, MergeMethod,
    MergeStateStatus, Mergeable, PullRequest, RateLimit,
};

// Re-export octocrab so consumers don't need to depend on it directly
pub use octocrab;
