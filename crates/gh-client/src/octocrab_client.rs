//! Octocrab-based GitHub API client
//!
//! Direct implementation of the `GitHubClient` trait using the octocrab library.
//! Pull request listing and auto-merge go through GraphQL because the REST
//! API does not expose `mergeStateStatus` or auto-merge requests; everything
//! else uses REST.

use crate::client::GitHubClient;
use crate::error::{ApiOperation, BoxError, GraphQlError, HostingApiError, Result};
use crate::types::{
    BranchUpdateStrategy, CheckConclusion, CheckRun, CheckRunStatus, LabelSpec, MergeMethod,
    MergeStateStatus, Mergeable, PullRequest, RateLimit,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, warn};
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Page size for the pull request listing query
const PR_PAGE_SIZE: u32 = 50;

/// Safety limit on listing pages
const MAX_PR_PAGES: u32 = 20;

const OPEN_PULL_REQUESTS_QUERY: &str = r#"
query($owner: String!, $repo: String!, $first: Int!, $after: String) {
    repository(owner: $owner, name: $repo) {
        pullRequests(states: OPEN, first: $first, after: $after, orderBy: {field: CREATED_AT, direction: ASC}) {
            pageInfo {
                hasNextPage
                endCursor
            }
            nodes {
                id
                number
                title
                url
                isDraft
                isCrossRepository
                createdAt
                headRefName
                baseRefName
                headRefOid
                mergeable
                mergeStateStatus
                author {
                    login
                }
                labels(first: 100) {
                    nodes {
                        name
                    }
                }
                autoMergeRequest {
                    enabledAt
                }
            }
        }
    }
}
"#;

const ENABLE_AUTO_MERGE_MUTATION: &str = r#"
mutation($pullRequestId: ID!, $mergeMethod: PullRequestMergeMethod!) {
    enablePullRequestAutoMerge(input: {pullRequestId: $pullRequestId, mergeMethod: $mergeMethod}) {
        pullRequest {
            autoMergeRequest {
                enabledAt
            }
        }
    }
}
"#;

/// Direct GitHub API client using octocrab
#[derive(Debug, Clone)]
pub struct OctocrabClient {
    octocrab: Arc<Octocrab>,
}

impl OctocrabClient {
    /// Create a new client with the given octocrab instance
    pub fn new(octocrab: Arc<Octocrab>) -> Self {
        Self { octocrab }
    }

    /// Run a GraphQL document and unwrap its `data` member
    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> std::result::Result<T, BoxError> {
        let payload = serde_json::json!({
            "query": query,
            "variables": variables,
        });
        let response: GraphQlResponse<T> = self.octocrab.graphql(&payload).await?;

        if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
            let message = errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Box::new(GraphQlError(message)));
        }

        response
            .data
            .ok_or_else(|| Box::new(GraphQlError("response has no data".to_string())) as BoxError)
    }

    /// Merge the base branch into the head branch
    async fn merge_base_into_head(
        &self,
        owner: &str,
        repo: &str,
        pr: &PullRequest,
    ) -> std::result::Result<(), octocrab::Error> {
        #[derive(Serialize)]
        struct MergeRequest<'a> {
            base: &'a str,
            head: &'a str,
            commit_message: String,
        }

        let request = MergeRequest {
            base: &pr.head_branch,
            head: &pr.base_branch,
            commit_message: format!(
                "Merge branch '{}' into {}",
                pr.base_branch, pr.head_branch
            ),
        };
        let route = format!("/repos/{}/{}/merges", owner, repo);
        let _: serde_json::Value = self.octocrab.post(route, Some(&request)).await?;
        Ok(())
    }
}

#[async_trait]
impl GitHubClient for OctocrabClient {
    async fn fetch_open_pull_requests(&self, owner: &str, repo: &str) -> Result<Vec<PullRequest>> {
        debug!("Fetching open PRs for {}/{}", owner, repo);

        let mut prs = Vec::new();
        let mut cursor: Option<String> = None;

        for page in 1..=MAX_PR_PAGES {
            let variables = serde_json::json!({
                "owner": owner,
                "repo": repo,
                "first": PR_PAGE_SIZE,
                "after": cursor,
            });
            let data: PullRequestsData = self
                .graphql(OPEN_PULL_REQUESTS_QUERY, variables)
                .await
                .map_err(|e| HostingApiError::new(ApiOperation::ListPullRequests, e))?;

            let connection = data
                .repository
                .ok_or_else(|| {
                    HostingApiError::new(
                        ApiOperation::ListPullRequests,
                        format!("repository {}/{} not found", owner, repo),
                    )
                })?
                .pull_requests;

            prs.extend(connection.nodes.into_iter().flatten().map(convert_pull_request));

            if !connection.page_info.has_next_page {
                break;
            }
            if page == MAX_PR_PAGES {
                warn!(
                    "Stopped listing PRs for {}/{} after {} pages; results are incomplete",
                    owner, repo, page
                );
            }
            cursor = connection.page_info.end_cursor;
        }

        debug!("Fetched {} open PRs for {}/{}", prs.len(), owner, repo);
        Ok(prs)
    }

    async fn fetch_check_runs(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        head_sha: &str,
    ) -> Result<Vec<CheckRun>> {
        debug!("Fetching check runs for {}/{} @ {}", owner, repo, head_sha);

        let checks = self
            .octocrab
            .checks(owner, repo)
            .list_check_runs_for_git_ref(head_sha.to_string().into())
            .send()
            .await
            .map_err(|e| HostingApiError::for_pr(ApiOperation::ListCheckRuns, pr_number, e))?;

        let runs = checks
            .check_runs
            .into_iter()
            .map(|run| {
                // Determine status based on whether completed_at is set
                let status = if run.completed_at.is_some() {
                    CheckRunStatus::Completed
                } else if run.started_at.is_some() {
                    CheckRunStatus::InProgress
                } else {
                    CheckRunStatus::Queued
                };

                CheckRun {
                    id: run.id.0,
                    name: run.name,
                    status,
                    conclusion: run.conclusion.as_deref().map(convert_conclusion_string),
                }
            })
            .collect();

        Ok(runs)
    }

    async fn rerun_check_run(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        check_run_id: u64,
    ) -> Result<()> {
        debug!(
            "Rerequesting check run {} for PR #{} in {}/{}",
            check_run_id, pr_number, owner, repo
        );
        let route = format!(
            "/repos/{}/{}/check-runs/{}/rerequest",
            owner, repo, check_run_id
        );
        self.octocrab
            .post::<(), serde_json::Value>(route, None::<&()>)
            .await
            .map_err(|e| HostingApiError::for_pr(ApiOperation::RerunCheckRun, pr_number, e))?;
        Ok(())
    }

    async fn update_pull_request_branch(
        &self,
        owner: &str,
        repo: &str,
        pr: &PullRequest,
    ) -> Result<BranchUpdateStrategy> {
        let mut last_error: Option<octocrab::Error> = None;

        for &strategy in pr.branch_update_strategies() {
            let attempt = match strategy {
                BranchUpdateStrategy::MergeBase => self.merge_base_into_head(owner, repo, pr).await,
                BranchUpdateStrategy::UpdateBranch => self
                    .octocrab
                    .pulls(owner, repo)
                    .update_branch(pr.number)
                    .await
                    .map(|_| ()),
            };
            match attempt {
                Ok(()) => return Ok(strategy),
                Err(e) => {
                    debug!(
                        "Branch update via {} failed for PR #{}: {}",
                        strategy, pr.number, e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => HostingApiError::for_pr(ApiOperation::UpdateBranch, pr.number, e),
            None => HostingApiError::for_pr(
                ApiOperation::UpdateBranch,
                pr.number,
                "no branch update strategy",
            ),
        })
    }

    async fn enable_auto_merge(
        &self,
        owner: &str,
        repo: &str,
        pr: &PullRequest,
        merge_method: MergeMethod,
    ) -> Result<()> {
        debug!(
            "Enabling auto-merge ({}) for PR #{} in {}/{}",
            merge_method.as_graphql(),
            pr.number,
            owner,
            repo
        );
        let variables = serde_json::json!({
            "pullRequestId": pr.node_id,
            "mergeMethod": merge_method.as_graphql(),
        });
        let _: serde_json::Value = self
            .graphql(ENABLE_AUTO_MERGE_MUTATION, variables)
            .await
            .map_err(|e| HostingApiError::for_pr(ApiOperation::EnableAutoMerge, pr.number, e))?;
        Ok(())
    }

    async fn add_label(&self, owner: &str, repo: &str, pr_number: u64, label: &str) -> Result<()> {
        self.octocrab
            .issues(owner, repo)
            .add_labels(pr_number, &[label.to_string()])
            .await
            .map_err(|e| HostingApiError::for_pr(ApiOperation::AddLabel, pr_number, e))?;
        Ok(())
    }

    async fn remove_label(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        label: &str,
    ) -> Result<()> {
        self.octocrab
            .issues(owner, repo)
            .remove_label(pr_number, label)
            .await
            .map_err(|e| HostingApiError::for_pr(ApiOperation::RemoveLabel, pr_number, e))?;
        Ok(())
    }

    async fn create_comment(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        body: &str,
    ) -> Result<()> {
        self.octocrab
            .issues(owner, repo)
            .create_comment(pr_number, body)
            .await
            .map_err(|e| HostingApiError::for_pr(ApiOperation::CreateComment, pr_number, e))?;
        Ok(())
    }

    async fn fetch_repository_labels(&self, owner: &str, repo: &str) -> Result<Vec<String>> {
        let page = self
            .octocrab
            .issues(owner, repo)
            .list_labels_for_repo()
            .per_page(100)
            .send()
            .await
            .map_err(|e| HostingApiError::new(ApiOperation::ListLabels, e))?;

        let labels = self
            .octocrab
            .all_pages(page)
            .await
            .map_err(|e| HostingApiError::new(ApiOperation::ListLabels, e))?;

        Ok(labels.into_iter().map(|l| l.name).collect())
    }

    async fn create_label(&self, owner: &str, repo: &str, label: &LabelSpec) -> Result<()> {
        self.octocrab
            .issues(owner, repo)
            .create_label(&label.name, &label.color, &label.description)
            .await
            .map_err(|e| HostingApiError::new(ApiOperation::CreateLabel, e))?;
        Ok(())
    }

    async fn fetch_rate_limit(&self) -> Result<RateLimit> {
        let response: RateLimitResponse = self
            .octocrab
            .get("/rate_limit", None::<&()>)
            .await
            .map_err(|e| HostingApiError::new(ApiOperation::RateLimit, e))?;

        let core = response.resources.core;
        let reset_at = Utc
            .timestamp_opt(core.reset, 0)
            .single()
            .ok_or_else(|| {
                HostingApiError::new(
                    ApiOperation::RateLimit,
                    format!("invalid reset timestamp {}", core.reset),
                )
            })?;

        Ok(RateLimit {
            remaining: core.remaining,
            limit: core.limit,
            reset_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlErrorEntry>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestsData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    pull_requests: PullRequestConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestConnection {
    page_info: PageInfo,
    nodes: Vec<Option<PullRequestNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestNode {
    id: String,
    number: u64,
    title: String,
    url: String,
    is_draft: bool,
    #[serde(default)]
    is_cross_repository: bool,
    created_at: DateTime<Utc>,
    head_ref_name: String,
    base_ref_name: String,
    head_ref_oid: String,
    mergeable: String,
    merge_state_status: String,
    author: Option<AuthorNode>,
    labels: Option<LabelConnection>,
    auto_merge_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct AuthorNode {
    login: String,
}

#[derive(Debug, Deserialize)]
struct LabelConnection {
    nodes: Vec<Option<LabelNode>>,
}

#[derive(Debug, Deserialize)]
struct LabelNode {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

#[derive(Debug, Deserialize)]
struct RateLimitResources {
    core: RateLimitCore,
}

#[derive(Debug, Deserialize)]
struct RateLimitCore {
    limit: u64,
    remaining: u64,
    reset: i64,
}

/// Convert a GraphQL pull request node to our PullRequest type
fn convert_pull_request(node: PullRequestNode) -> PullRequest {
    let labels: BTreeSet<String> = node
        .labels
        .map(|c| c.nodes.into_iter().flatten().map(|l| l.name).collect())
        .unwrap_or_default();

    PullRequest {
        number: node.number,
        node_id: node.id,
        title: node.title,
        url: node.url,
        author: node
            .author
            .map(|a| a.login)
            .unwrap_or_else(|| "ghost".to_string()),
        head_branch: node.head_ref_name,
        base_branch: node.base_ref_name,
        head_sha: node.head_ref_oid,
        is_draft: node.is_draft,
        is_cross_repository: node.is_cross_repository,
        created_at: node.created_at,
        mergeable: parse_mergeable(&node.mergeable),
        merge_state_status: parse_merge_state_status(&node.merge_state_status),
        labels,
        has_auto_merge: node.auto_merge_request.is_some_and(|v| !v.is_null()),
        checks: Vec::new(),
    }
}

/// Parses the GraphQL `MergeableState` value
fn parse_mergeable(value: &str) -> Mergeable {
    match value.to_uppercase().as_str() {
        "MERGEABLE" => Mergeable::Mergeable,
        "CONFLICTING" => Mergeable::Conflicting,
        _ => Mergeable::Unknown,
    }
}

/// Parses the GraphQL `MergeStateStatus` value
fn parse_merge_state_status(value: &str) -> MergeStateStatus {
    match value.to_uppercase().as_str() {
        "CLEAN" => MergeStateStatus::Clean,
        "BEHIND" => MergeStateStatus::Behind,
        "DIRTY" => MergeStateStatus::Dirty,
        "BLOCKED" => MergeStateStatus::Blocked,
        "UNSTABLE" => MergeStateStatus::Unstable,
        // HAS_HOOKS, DRAFT and anything GitHub adds later
        _ => MergeStateStatus::Unknown,
    }
}

/// Convert conclusion string from GitHub API to our enum
fn convert_conclusion_string(conclusion: &str) -> CheckConclusion {
    match conclusion.to_lowercase().as_str() {
        "success" => CheckConclusion::Success,
        "failure" | "timed_out" | "action_required" => CheckConclusion::Failure,
        "cancelled" => CheckConclusion::Cancelled,
        "skipped" => CheckConclusion::Skipped,
        _ => CheckConclusion::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_conclusion_string() {
        assert_eq!(convert_conclusion_string("success"), CheckConclusion::Success);
        assert_eq!(convert_conclusion_string("SUCCESS"), CheckConclusion::Success);
        assert_eq!(convert_conclusion_string("failure"), CheckConclusion::Failure);
        assert_eq!(convert_conclusion_string("timed_out"), CheckConclusion::Failure);
        assert_eq!(
            convert_conclusion_string("action_required"),
            CheckConclusion::Failure
        );
        assert_eq!(convert_conclusion_string("cancelled"), CheckConclusion::Cancelled);
        assert_eq!(convert_conclusion_string("skipped"), CheckConclusion::Skipped);
        assert_eq!(convert_conclusion_string("neutral"), CheckConclusion::Neutral);
        assert_eq!(convert_conclusion_string("stale"), CheckConclusion::Neutral);
    }

    #[test]
    fn test_parse_merge_state_status() {
        assert_eq!(parse_merge_state_status("BEHIND"), MergeStateStatus::Behind);
        assert_eq!(parse_merge_state_status("dirty"), MergeStateStatus::Dirty);
        assert_eq!(parse_merge_state_status("HAS_HOOKS"), MergeStateStatus::Unknown);
        assert_eq!(parse_merge_state_status("DRAFT"), MergeStateStatus::Unknown);
    }

    #[test]
    fn test_parse_mergeable() {
        assert_eq!(parse_mergeable("MERGEABLE"), Mergeable::Mergeable);
        assert_eq!(parse_mergeable("CONFLICTING"), Mergeable::Conflicting);
        assert_eq!(parse_mergeable("UNKNOWN"), Mergeable::Unknown);
    }

    #[test]
    fn test_convert_pull_request_node() {
        let json = r#"{
            "id": "PR_kwDOABC",
            "number": 42,
            "title": "Bump serde",
            "url": "https://github.com/o/r/pull/42",
            "isDraft": false,
            "createdAt": "2024-01-01T00:00:00Z",
            "headRefName": "deps/serde",
            "baseRefName": "main",
            "headRefOid": "abc123",
            "mergeable": "MERGEABLE",
            "mergeStateStatus": "BEHIND",
            "author": {"login": "dependabot"},
            "labels": {"nodes": [{"name": "auto-updated"}, {"name": "deps"}]},
            "autoMergeRequest": null
        }"#;
        let node: PullRequestNode = serde_json::from_str(json).unwrap();
        let pr = convert_pull_request(node);

        assert_eq!(pr.number, 42);
        assert_eq!(pr.node_id, "PR_kwDOABC");
        assert_eq!(pr.author, "dependabot");
        assert_eq!(pr.merge_state_status, MergeStateStatus::Behind);
        assert_eq!(pr.mergeable, Mergeable::Mergeable);
        assert!(!pr.is_cross_repository);
        assert!(pr.has_label("auto-updated"));
        assert!(!pr.has_auto_merge);
        assert!(pr.checks.is_empty());
    }

    #[test]
    fn test_convert_pull_request_with_auto_merge_and_ghost_author() {
        let json = r#"{
            "id": "PR_2",
            "number": 7,
            "title": "Draft",
            "url": "https://github.com/o/r/pull/7",
            "isDraft": true,
            "isCrossRepository": true,
            "createdAt": "2024-01-01T00:00:00Z",
            "headRefName": "wip",
            "baseRefName": "main",
            "headRefOid": "def456",
            "mergeable": "UNKNOWN",
            "mergeStateStatus": "DRAFT",
            "author": null,
            "labels": null,
            "autoMergeRequest": {"enabledAt": "2024-01-02T00:00:00Z"}
        }"#;
        let node: PullRequestNode = serde_json::from_str(json).unwrap();
        let pr = convert_pull_request(node);

        assert!(pr.is_draft);
        assert!(pr.is_cross_repository);
        assert_eq!(
            pr.branch_update_strategies(),
            [BranchUpdateStrategy::UpdateBranch]
        );
        assert!(pr.has_auto_merge);
        assert_eq!(pr.author, "ghost");
        assert!(pr.labels.is_empty());
    }

    #[test]
    fn test_graphql_error_response() {
        let json = r#"{"data": null, "errors": [{"message": "Bad credentials"}]}"#;
        let response: GraphQlResponse<PullRequestsData> = serde_json::from_str(json).unwrap();
        assert!(response.data.is_none());
        assert_eq!(response.errors.unwrap()[0].message, "Bad credentials");
    }

    #[test]
    fn test_rate_limit_response() {
        let json = r#"{
            "resources": {"core": {"limit": 5000, "remaining": 4, "reset": 1700000000, "used": 4996}},
            "rate": {"limit": 5000, "remaining": 4, "reset": 1700000000, "used": 4996}
        }"#;
        let response: RateLimitResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.resources.core.remaining, 4);
        assert_eq!(response.resources.core.reset, 1_700_000_000);
    }
}
