//! GitHub client trait definition
//!
//! This module defines the core `GitHubClient` trait that all client
//! implementations must satisfy. The guardian only talks to GitHub through
//! this trait, which keeps the control loop testable against in-memory fakes.

use crate::error::Result;
use crate::types::{
    BranchUpdateStrategy, CheckRun, LabelSpec, MergeMethod, PullRequest, RateLimit,
};
use async_trait::async_trait;

/// GitHub API client trait
///
/// Defines the interface for interacting with the GitHub API.
/// Implementations make the calls without retrying: retry policy belongs
/// to the caller.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow sharing across
/// async tasks and threads.
///
/// # Example
///
/// ```rust,ignore
/// use gh_client::{GitHubClient, PullRequest};
///
/// async fn list_prs(client: &dyn GitHubClient) -> gh_client::Result<Vec<PullRequest>> {
///     client.fetch_open_pull_requests("rust-lang", "rust").await
/// }
/// ```
#[async_trait]
pub trait GitHubClient: Send + Sync {
    /// Fetch all open pull requests of a repository
    ///
    /// Drafts are included; `checks` is left empty and filled by the caller.
    ///
    /// # Arguments
    ///
    /// * `owner` - Repository owner (user or organization)
    /// * `repo` - Repository name
    async fn fetch_open_pull_requests(&self, owner: &str, repo: &str) -> Result<Vec<PullRequest>>;

    /// Fetch CI check runs for the HEAD commit of a pull request
    ///
    /// # Arguments
    ///
    /// * `owner` - Repository owner
    /// * `repo` - Repository name
    /// * `pr_number` - Pull request the commit belongs to (for error context)
    /// * `head_sha` - The commit SHA to get checks for
    async fn fetch_check_runs(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        head_sha: &str,
    ) -> Result<Vec<CheckRun>>;

    /// Ask GitHub to run a check again
    ///
    /// # Arguments
    ///
    /// * `owner` - Repository owner
    /// * `repo` - Repository name
    /// * `pr_number` - Pull request the check belongs to (for error context)
    /// * `check_run_id` - The check run to rerequest
    async fn rerun_check_run(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        check_run_id: u64,
    ) -> Result<()>;

    /// Bring a PR's head branch up to date with its base branch
    ///
    /// Tries merging the base branch into the head branch first and falls
    /// back to GitHub's "Update branch" endpoint.
    ///
    /// # Returns
    ///
    /// The strategy that succeeded, or the fallback's error if both failed
    async fn update_pull_request_branch(
        &self,
        owner: &str,
        repo: &str,
        pr: &PullRequest,
    ) -> Result<BranchUpdateStrategy>;

    /// Request auto-merge for a pull request
    ///
    /// GitHub treats this as idempotent.
    async fn enable_auto_merge(
        &self,
        owner: &str,
        repo: &str,
        pr: &PullRequest,
        merge_method: MergeMethod,
    ) -> Result<()>;

    /// Attach a label to a pull request
    async fn add_label(&self, owner: &str, repo: &str, pr_number: u64, label: &str) -> Result<()>;

    /// Detach a label from a pull request
    async fn remove_label(&self, owner: &str, repo: &str, pr_number: u64, label: &str)
        -> Result<()>;

    /// Post a comment on a pull request
    async fn create_comment(&self, owner: &str, repo: &str, pr_number: u64, body: &str)
        -> Result<()>;

    /// Fetch the names of all labels defined on the repository
    async fn fetch_repository_labels(&self, owner: &str, repo: &str) -> Result<Vec<String>>;

    /// Define a new label on the repository
    async fn create_label(&self, owner: &str, repo: &str, label: &LabelSpec) -> Result<()>;

    /// Fetch the remaining quota of the core REST API
    async fn fetch_rate_limit(&self) -> Result<RateLimit>;
}
