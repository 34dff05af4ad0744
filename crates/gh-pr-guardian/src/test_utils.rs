//! In-memory GitHub used by the unit tests
//!
//! `FakeGitHub` keeps the remote state (PRs, labels, checks) and records every
//! call so tests can assert on exactly what the guardian asked GitHub to do.
//! Label mutations change the stored PRs, so a second run sees the first
//! run's labels just like it would against GitHub.

use crate::engine::{RemediationContext, RemediationSettings};
use crate::ledger::Ledger;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use gh_client::{
    ApiOperation, BranchUpdateStrategy, CheckConclusion, CheckRun, CheckRunStatus, GitHubClient,
    HostingApiError, LabelSpec, MergeMethod, MergeStateStatus, Mergeable, PullRequest, RateLimit,
};
use gh_pr_guardian_config::{GuardianConfig, RepositoryRef};
use std::collections::{BTreeSet, HashSet};
use std::sync::Mutex;

/// A recorded client call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListPullRequests,
    ListCheckRuns(u64),
    RerunCheckRun { pr: u64, check_run_id: u64 },
    UpdateBranch(u64),
    EnableAutoMerge(u64),
    AddLabel(u64, String),
    RemoveLabel(u64, String),
    CreateComment(u64, String),
    ListLabels,
    CreateLabel(String),
    RateLimit,
}

#[derive(Default)]
struct FakeState {
    prs: Vec<PullRequest>,
    repository_labels: Vec<String>,
    rate_limit: Option<RateLimit>,
    failures: HashSet<(ApiOperation, Option<u64>)>,
    calls: Vec<Call>,
}

#[derive(Default)]
pub struct FakeGitHub {
    state: Mutex<FakeState>,
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an open PR; its `checks` are served by `fetch_check_runs`
    pub fn with_pr(self, pr: PullRequest) -> Self {
        self.state.lock().unwrap().prs.push(pr);
        self
    }

    pub fn with_repository_labels(self, labels: &[&str]) -> Self {
        self.state.lock().unwrap().repository_labels =
            labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_rate_limit(self, rate_limit: RateLimit) -> Self {
        self.state.lock().unwrap().rate_limit = Some(rate_limit);
        self
    }

    /// Every call of `operation` fails
    pub fn failing(self, operation: ApiOperation) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert((operation, None));
        self
    }

    /// Calls of `operation` concerning PR `pr_number` fail
    pub fn failing_for(self, operation: ApiOperation, pr_number: u64) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert((operation, Some(pr_number)));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_matching(&self, predicate: impl Fn(&Call) -> bool) -> Vec<Call> {
        self.calls().into_iter().filter(|c| predicate(c)).collect()
    }

    /// Calls that change something on GitHub
    pub fn mutations(&self) -> Vec<Call> {
        self.calls_matching(|c| {
            matches!(
                c,
                Call::RerunCheckRun { .. }
                    | Call::UpdateBranch(_)
                    | Call::EnableAutoMerge(_)
                    | Call::AddLabel(..)
                    | Call::RemoveLabel(..)
                    | Call::CreateComment(..)
                    | Call::CreateLabel(_)
            )
        })
    }

    pub fn comments_on(&self, pr_number: u64) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CreateComment(n, body) if n == pr_number => Some(body),
                _ => None,
            })
            .collect()
    }

    /// Current remote labels of a PR
    pub fn labels_of(&self, pr_number: u64) -> BTreeSet<String> {
        self.state
            .lock()
            .unwrap()
            .prs
            .iter()
            .find(|pr| pr.number == pr_number)
            .map(|pr| pr.labels.clone())
            .unwrap_or_default()
    }

    fn record(
        &self,
        call: Call,
        operation: ApiOperation,
        pr_number: Option<u64>,
    ) -> Result<(), HostingApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);

        let fails = state.failures.contains(&(operation, None))
            || pr_number.is_some_and(|n| state.failures.contains(&(operation, Some(n))));
        if fails {
            return Err(match pr_number {
                Some(n) => HostingApiError::for_pr(operation, n, "injected failure"),
                None => HostingApiError::new(operation, "injected failure"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl GitHubClient for FakeGitHub {
    async fn fetch_open_pull_requests(
        &self,
        _owner: &str,
        _repo: &str,
    ) -> gh_client::Result<Vec<PullRequest>> {
        self.record(Call::ListPullRequests, ApiOperation::ListPullRequests, None)?;
        let prs = self.state.lock().unwrap().prs.clone();
        Ok(prs
            .into_iter()
            .map(|mut pr| {
                pr.checks.clear();
                pr
            })
            .collect())
    }

    async fn fetch_check_runs(
        &self,
        _owner: &str,
        _repo: &str,
        pr_number: u64,
        _head_sha: &str,
    ) -> gh_client::Result<Vec<CheckRun>> {
        self.record(
            Call::ListCheckRuns(pr_number),
            ApiOperation::ListCheckRuns,
            Some(pr_number),
        )?;
        let state = self.state.lock().unwrap();
        Ok(state
            .prs
            .iter()
            .find(|pr| pr.number == pr_number)
            .map(|pr| pr.checks.clone())
            .unwrap_or_default())
    }

    async fn rerun_check_run(
        &self,
        _owner: &str,
        _repo: &str,
        pr_number: u64,
        check_run_id: u64,
    ) -> gh_client::Result<()> {
        self.record(
            Call::RerunCheckRun {
                pr: pr_number,
                check_run_id,
            },
            ApiOperation::RerunCheckRun,
            Some(pr_number),
        )
    }

    async fn update_pull_request_branch(
        &self,
        _owner: &str,
        _repo: &str,
        pr: &PullRequest,
    ) -> gh_client::Result<BranchUpdateStrategy> {
        self.record(
            Call::UpdateBranch(pr.number),
            ApiOperation::UpdateBranch,
            Some(pr.number),
        )?;
        // The first strategy always succeeds here
        Ok(pr.branch_update_strategies()[0])
    }

    async fn enable_auto_merge(
        &self,
        _owner: &str,
        _repo: &str,
        pr: &PullRequest,
        _merge_method: MergeMethod,
    ) -> gh_client::Result<()> {
        self.record(
            Call::EnableAutoMerge(pr.number),
            ApiOperation::EnableAutoMerge,
            Some(pr.number),
        )?;
        let mut state = self.state.lock().unwrap();
        if let Some(stored) = state.prs.iter_mut().find(|p| p.number == pr.number) {
            stored.has_auto_merge = true;
        }
        Ok(())
    }

    async fn add_label(
        &self,
        _owner: &str,
        _repo: &str,
        pr_number: u64,
        label: &str,
    ) -> gh_client::Result<()> {
        self.record(
            Call::AddLabel(pr_number, label.to_string()),
            ApiOperation::AddLabel,
            Some(pr_number),
        )?;
        let mut state = self.state.lock().unwrap();
        if let Some(pr) = state.prs.iter_mut().find(|p| p.number == pr_number) {
            if !pr.has_label(label) {
                pr.labels.insert(label.to_string());
            }
        }
        Ok(())
    }

    async fn remove_label(
        &self,
        _owner: &str,
        _repo: &str,
        pr_number: u64,
        label: &str,
    ) -> gh_client::Result<()> {
        self.record(
            Call::RemoveLabel(pr_number, label.to_string()),
            ApiOperation::RemoveLabel,
            Some(pr_number),
        )?;
        let mut state = self.state.lock().unwrap();
        let removed = match state.prs.iter_mut().find(|p| p.number == pr_number) {
            Some(pr) if pr.has_label(label) => {
                pr.remove_label(label);
                true
            }
            _ => false,
        };
        if removed {
            Ok(())
        } else {
            Err(HostingApiError::for_pr(
                ApiOperation::RemoveLabel,
                pr_number,
                "Label does not exist (404 Not Found)",
            ))
        }
    }

    async fn create_comment(
        &self,
        _owner: &str,
        _repo: &str,
        pr_number: u64,
        body: &str,
    ) -> gh_client::Result<()> {
        self.record(
            Call::CreateComment(pr_number, body.to_string()),
            ApiOperation::CreateComment,
            Some(pr_number),
        )
    }

    async fn fetch_repository_labels(
        &self,
        _owner: &str,
        _repo: &str,
    ) -> gh_client::Result<Vec<String>> {
        self.record(Call::ListLabels, ApiOperation::ListLabels, None)?;
        Ok(self.state.lock().unwrap().repository_labels.clone())
    }

    async fn create_label(
        &self,
        _owner: &str,
        _repo: &str,
        label: &LabelSpec,
    ) -> gh_client::Result<()> {
        self.record(
            Call::CreateLabel(label.name.clone()),
            ApiOperation::CreateLabel,
            None,
        )?;
        let mut state = self.state.lock().unwrap();
        if state
            .repository_labels
            .iter()
            .any(|name| name.eq_ignore_ascii_case(&label.name))
        {
            return Err(HostingApiError::new(
                ApiOperation::CreateLabel,
                "Validation Failed: already_exists (422)",
            ));
        }
        state.repository_labels.push(label.name.clone());
        Ok(())
    }

    async fn fetch_rate_limit(&self) -> gh_client::Result<RateLimit> {
        self.record(Call::RateLimit, ApiOperation::RateLimit, None)?;
        let configured = self.state.lock().unwrap().rate_limit;
        Ok(configured.unwrap_or_else(|| RateLimit {
            remaining: 5000,
            limit: 5000,
            reset_at: Utc::now() + Duration::hours(1),
        }))
    }
}

/// An open, mergeable, up-to-date PR created yesterday with no checks
pub fn pr(number: u64) -> PullRequest {
    PullRequest {
        number,
        node_id: format!("PR_{}", number),
        title: format!("Test PR {}", number),
        url: format!("https://github.com/acme/widgets/pull/{}", number),
        author: "octocat".to_string(),
        head_branch: format!("feature-{}", number),
        base_branch: "main".to_string(),
        head_sha: format!("sha{}", number),
        is_draft: false,
        is_cross_repository: false,
        created_at: Utc::now() - Duration::days(1),
        mergeable: Mergeable::Unknown,
        merge_state_status: MergeStateStatus::Clean,
        labels: BTreeSet::new(),
        has_auto_merge: false,
        checks: vec![],
    }
}

pub fn completed(id: u64, name: &str, conclusion: CheckConclusion) -> CheckRun {
    CheckRun {
        id,
        name: name.to_string(),
        status: CheckRunStatus::Completed,
        conclusion: Some(conclusion),
    }
}

pub fn in_progress(id: u64, name: &str) -> CheckRun {
    CheckRun {
        id,
        name: name.to_string(),
        status: CheckRunStatus::InProgress,
        conclusion: None,
    }
}

/// A fake client plus everything needed to build a `RemediationContext`
pub struct Harness {
    pub fake: FakeGitHub,
    pub repository: RepositoryRef,
    pub ledger: Ledger,
    pub settings: RemediationSettings,
}

impl Harness {
    pub fn new(fake: FakeGitHub) -> Self {
        Self {
            fake,
            repository: RepositoryRef::new("acme", "widgets"),
            ledger: Ledger::in_memory(),
            settings: RemediationSettings::from_config(&GuardianConfig::default()).unwrap(),
        }
    }

    pub fn with_settings(mut self, change: impl FnOnce(&mut RemediationSettings)) -> Self {
        change(&mut self.settings);
        self
    }

    pub fn context(&self) -> RemediationContext<'_> {
        RemediationContext {
            client: &self.fake,
            repository: &self.repository,
            ledger: &self.ledger,
            settings: &self.settings,
            now: Utc::now(),
        }
    }
}
