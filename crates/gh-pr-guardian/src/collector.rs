//! PR state collector
//!
//! Lists the open pull requests and attaches their check runs. Drafts are
//! dropped before any further call is made for them.

use gh_client::{GitHubClient, HostingApiError, PullRequest};
use gh_pr_guardian_config::RepositoryRef;

/// Snapshots gathered for one run
#[derive(Debug, Default)]
pub struct Collection {
    /// Non-draft PRs with their checks, in listing order
    pub snapshots: Vec<PullRequest>,
    /// Number of open PRs returned by the listing
    pub listed: usize,
    /// Number of drafts skipped
    pub drafts_skipped: usize,
    /// PRs skipped because their checks could not be fetched
    pub failed: Vec<u64>,
}

/// Build fresh snapshots of every open, non-draft PR
///
/// Only a failing PR listing is an error; a PR whose checks cannot be
/// fetched is logged and left out.
pub async fn collect(
    client: &dyn GitHubClient,
    repository: &RepositoryRef,
) -> Result<Collection, HostingApiError> {
    let prs = client
        .fetch_open_pull_requests(&repository.owner, &repository.name)
        .await?;

    log::info!("Found {} open pull requests in {}", prs.len(), repository);

    let mut collection = Collection {
        listed: prs.len(),
        ..Default::default()
    };

    for mut pr in prs {
        if pr.is_draft {
            log::debug!("PR #{}: draft, skipped", pr.number);
            collection.drafts_skipped += 1;
            continue;
        }

        match client
            .fetch_check_runs(&repository.owner, &repository.name, pr.number, &pr.head_sha)
            .await
        {
            Ok(checks) => {
                log::debug!("PR #{}: {} check runs", pr.number, checks.len());
                pr.checks = checks;
                collection.snapshots.push(pr);
            }
            Err(e) => {
                log::error!("{}", e);
                collection.failed.push(pr.number);
            }
        }
    }

    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{completed, pr, Call, FakeGitHub};
    use gh_client::{ApiOperation, CheckConclusion};

    fn repo() -> RepositoryRef {
        RepositoryRef::new("acme", "widgets")
    }

    #[tokio::test]
    async fn test_collect_attaches_checks() {
        let mut with_checks = pr(1);
        with_checks.checks = vec![completed(100, "build", CheckConclusion::Success)];
        let fake = FakeGitHub::new().with_pr(with_checks).with_pr(pr(2));

        let collection = collect(&fake, &repo()).await.unwrap();

        assert_eq!(collection.listed, 2);
        let numbers: Vec<u64> = collection.snapshots.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(collection.snapshots[0].checks.len(), 1);
        assert!(collection.snapshots[1].checks.is_empty());
    }

    #[tokio::test]
    async fn test_drafts_are_dropped_without_calls() {
        let mut draft = pr(3);
        draft.is_draft = true;
        let fake = FakeGitHub::new().with_pr(draft).with_pr(pr(4));

        let collection = collect(&fake, &repo()).await.unwrap();

        assert_eq!(collection.drafts_skipped, 1);
        assert_eq!(collection.snapshots.len(), 1);
        assert_eq!(
            fake.calls(),
            vec![Call::ListPullRequests, Call::ListCheckRuns(4)]
        );
    }

    #[tokio::test]
    async fn test_failed_check_fetch_skips_only_that_pr() {
        let fake = FakeGitHub::new()
            .with_pr(pr(5))
            .with_pr(pr(6))
            .with_pr(pr(7))
            .failing_for(ApiOperation::ListCheckRuns, 6);

        let collection = collect(&fake, &repo()).await.unwrap();

        let numbers: Vec<u64> = collection.snapshots.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![5, 7]);
        assert_eq!(collection.failed, vec![6]);
    }

    #[tokio::test]
    async fn test_listing_failure_is_an_error() {
        let fake = FakeGitHub::new()
            .with_pr(pr(1))
            .failing(ApiOperation::ListPullRequests);

        let err = collect(&fake, &repo()).await.unwrap_err();

        assert_eq!(err.operation, ApiOperation::ListPullRequests);
    }
}
