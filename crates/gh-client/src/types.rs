//! GitHub API data transfer objects
//!
//! These types represent the data returned from the GitHub API.
//! They are intentionally separate from the guardian's decision logic
//! to keep this crate pure and reusable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An open pull request as seen at evaluation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number (e.g., 123)
    pub number: u64,

    /// GraphQL node id, required for GraphQL mutations
    pub node_id: String,

    /// PR title
    pub title: String,

    /// PR URL for opening in browser
    pub url: String,

    /// Author's GitHub username
    pub author: String,

    /// HEAD branch name (e.g., "feature/foo")
    pub head_branch: String,

    /// Base branch name (e.g., "main")
    pub base_branch: String,

    /// HEAD commit SHA
    pub head_sha: String,

    /// Whether the PR is still a draft
    pub is_draft: bool,

    /// Whether the head branch lives in a fork
    #[serde(default)]
    pub is_cross_repository: bool,

    /// When the PR was created
    pub created_at: DateTime<Utc>,

    /// Whether GitHub considers the PR mergeable
    pub mergeable: Mergeable,

    /// Merge state as reported by GitHub
    pub merge_state_status: MergeStateStatus,

    /// Labels currently attached to the PR
    pub labels: BTreeSet<String>,

    /// Whether auto-merge has already been requested
    pub has_auto_merge: bool,

    /// Check runs on the HEAD commit, in the order GitHub returned them
    #[serde(default)]
    pub checks: Vec<CheckRun>,
}

impl PullRequest {
    /// Returns true if the PR carries the given label
    ///
    /// GitHub label names are case-insensitive, so `Stale` matches `stale`.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|name| name.eq_ignore_ascii_case(label))
    }

    /// Drops the label from the snapshot, whatever its casing
    pub fn remove_label(&mut self, label: &str) {
        self.labels.retain(|name| !name.eq_ignore_ascii_case(label));
    }

    /// Branch update strategies to try, in order
    ///
    /// The merges API works on branches of the base repository, so a fork's
    /// head branch can only be updated through update-branch.
    pub fn branch_update_strategies(&self) -> &'static [BranchUpdateStrategy] {
        if self.is_cross_repository {
            &[BranchUpdateStrategy::UpdateBranch]
        } else {
            &[
                BranchUpdateStrategy::MergeBase,
                BranchUpdateStrategy::UpdateBranch,
            ]
        }
    }

    /// Age of the PR relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }
}

/// Tri-state mergeability reported by GitHub
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mergeable {
    /// The PR can be merged
    Mergeable,
    /// The PR has merge conflicts
    Conflicting,
    /// Not yet computed by GitHub
    #[default]
    Unknown,
}

/// Merge state status as reported by GitHub
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeStateStatus {
    /// The merge is clean
    Clean,
    /// The head branch is behind the base branch
    Behind,
    /// The merge has conflicts
    Dirty,
    /// The merge is blocked (e.g., by required reviews)
    Blocked,
    /// CI checks are failing or pending
    Unstable,
    /// State is unknown or not yet computed
    #[default]
    Unknown,
}

/// A CI check run from the GitHub API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRun {
    /// Check run ID
    pub id: u64,

    /// Name of the check (e.g., "build", "gitleaks")
    pub name: String,

    /// Current status
    pub status: CheckRunStatus,

    /// Conclusion (only set when status is Completed)
    pub conclusion: Option<CheckConclusion>,
}

impl CheckRun {
    /// Completed with a failing or cancelled conclusion
    pub fn has_failed(&self) -> bool {
        self.status == CheckRunStatus::Completed
            && matches!(
                self.conclusion,
                Some(CheckConclusion::Failure) | Some(CheckConclusion::Cancelled)
            )
    }

    /// Completed with the given conclusion
    pub fn concluded(&self, conclusion: CheckConclusion) -> bool {
        self.status == CheckRunStatus::Completed && self.conclusion == Some(conclusion)
    }
}

/// Status of a check run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckRunStatus {
    /// Check is queued
    Queued,
    /// Check is in progress
    InProgress,
    /// Check has completed
    Completed,
}

/// Conclusion of a completed check run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckConclusion {
    /// Check passed
    Success,
    /// Check failed (also timed out and action required)
    Failure,
    /// Check was cancelled
    Cancelled,
    /// Check was neutral (neither success nor failure)
    Neutral,
    /// Check was skipped
    Skipped,
}

/// Quota of the core REST API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Requests left in the current window
    pub remaining: u64,
    /// Total requests per window
    pub limit: u64,
    /// When the window resets
    pub reset_at: DateTime<Utc>,
}

/// How a PR branch was brought up to date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchUpdateStrategy {
    /// Base branch merged into the head branch via the merges API
    MergeBase,
    /// GitHub's "Update branch" endpoint
    UpdateBranch,
}

impl std::fmt::Display for BranchUpdateStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BranchUpdateStrategy::MergeBase => write!(f, "merge of the base branch"),
            BranchUpdateStrategy::UpdateBranch => write!(f, "update-branch"),
        }
    }
}

/// Merge method for pull requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMethod {
    /// Create a merge commit
    Merge,
    /// Squash all commits into one
    #[default]
    Squash,
    /// Rebase commits onto the base branch
    Rebase,
}

impl MergeMethod {
    /// Value of the GraphQL `PullRequestMergeMethod` enum
    pub fn as_graphql(&self) -> &'static str {
        match self {
            MergeMethod::Merge => "MERGE",
            MergeMethod::Squash => "SQUASH",
            MergeMethod::Rebase => "REBASE",
        }
    }
}

/// A repository label to create when missing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSpec {
    /// Label name
    pub name: String,
    /// Hex colour without the leading `#`
    pub color: String,
    /// Short description shown in the GitHub UI
    pub description: String,
}
