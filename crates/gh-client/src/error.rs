//! Error type shared by all client operations
//!
//! Every call that reaches GitHub fails with a [`HostingApiError`] naming the
//! operation and, when the call concerns a single pull request, its number.
//! The client never retries; callers decide what a failure means.

use std::fmt;
use thiserror::Error;

/// Boxed cause of a failed call
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used by [`crate::GitHubClient`]
pub type Result<T> = std::result::Result<T, HostingApiError>;

/// The client operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    ListPullRequests,
    ListCheckRuns,
    RerunCheckRun,
    UpdateBranch,
    EnableAutoMerge,
    AddLabel,
    RemoveLabel,
    CreateComment,
    ListLabels,
    CreateLabel,
    RateLimit,
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApiOperation::ListPullRequests => "list pull requests",
            ApiOperation::ListCheckRuns => "list check runs",
            ApiOperation::RerunCheckRun => "rerun check run",
            ApiOperation::UpdateBranch => "update branch",
            ApiOperation::EnableAutoMerge => "enable auto-merge",
            ApiOperation::AddLabel => "add label",
            ApiOperation::RemoveLabel => "remove label",
            ApiOperation::CreateComment => "create comment",
            ApiOperation::ListLabels => "list labels",
            ApiOperation::CreateLabel => "create label",
            ApiOperation::RateLimit => "query rate limit",
        };
        f.write_str(name)
    }
}

/// A failed GitHub API call
#[derive(Debug, Error)]
pub struct HostingApiError {
    /// What we were trying to do
    pub operation: ApiOperation,

    /// The pull request concerned, if any
    pub pr_number: Option<u64>,

    /// Underlying failure (octocrab, GraphQL errors, decoding)
    #[source]
    pub cause: BoxError,
}

impl fmt::Display for HostingApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pr_number {
            Some(number) => write!(f, "{} failed for PR #{}: {}", self.operation, number, self.cause),
            None => write!(f, "{} failed: {}", self.operation, self.cause),
        }
    }
}

impl HostingApiError {
    /// Creates an error for a repository-wide operation
    pub fn new(operation: ApiOperation, cause: impl Into<BoxError>) -> Self {
        Self {
            operation,
            pr_number: None,
            cause: cause.into(),
        }
    }

    /// Creates an error for an operation on a single pull request
    pub fn for_pr(operation: ApiOperation, pr_number: u64, cause: impl Into<BoxError>) -> Self {
        Self {
            operation,
            pr_number: Some(pr_number),
            cause: cause.into(),
        }
    }

    /// Returns true if GitHub answered 404 Not Found
    pub fn is_not_found(&self) -> bool {
        if let Some(octocrab::Error::GitHub { source, .. }) =
            self.cause.downcast_ref::<octocrab::Error>()
        {
            return source.status_code.as_u16() == 404;
        }
        let message = self.cause.to_string().to_lowercase();
        message.contains("404") || message.contains("not found")
    }
}

/// Error entries of a GraphQL response, reported as a single cause
#[derive(Debug, Error)]
#[error("GraphQL error: {0}")]
pub struct GraphQlError(pub String);
