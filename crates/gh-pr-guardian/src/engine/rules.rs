//! The built-in remediation rules

use super::{comments, ActionKind, RemediationContext, RemediationRule};
use crate::labels::GuardianLabel;
use async_trait::async_trait;
use gh_client::{
    CheckConclusion, CheckRun, HostingApiError, MergeStateStatus, Mergeable, PullRequest,
};

async fn comment(
    ctx: &RemediationContext<'_>,
    pr: &PullRequest,
    body: &str,
) -> Result<(), HostingApiError> {
    ctx.client
        .create_comment(&ctx.repository.owner, &ctx.repository.name, pr.number, body)
        .await
}

/// Flags PRs whose secret scan failed
///
/// With `auto_clear_secret_violation` the label is removed again once every
/// secret scan on the PR has passed.
pub struct SecretViolationRule;

impl SecretViolationRule {
    fn scans<'p>(ctx: &RemediationContext<'_>, pr: &'p PullRequest) -> Vec<&'p CheckRun> {
        pr.checks
            .iter()
            .filter(|check| ctx.settings.is_secret_scan(&check.name))
            .collect()
    }

    fn failed_scans<'p>(ctx: &RemediationContext<'_>, pr: &'p PullRequest) -> Vec<&'p CheckRun> {
        Self::scans(ctx, pr)
            .into_iter()
            .filter(|check| check.concluded(CheckConclusion::Failure))
            .collect()
    }

    fn scans_passed(ctx: &RemediationContext<'_>, pr: &PullRequest) -> bool {
        let scans = Self::scans(ctx, pr);
        !scans.is_empty() && scans.iter().all(|check| check.concluded(CheckConclusion::Success))
    }
}

#[async_trait]
impl RemediationRule for SecretViolationRule {
    fn kind(&self) -> ActionKind {
        ActionKind::SecretViolation
    }

    fn applies(&self, ctx: &RemediationContext<'_>, pr: &PullRequest) -> bool {
        if ctx.ledger.is_marked(pr, GuardianLabel::SecretViolation) {
            ctx.settings.auto_clear_secret_violation && Self::scans_passed(ctx, pr)
        } else {
            !Self::failed_scans(ctx, pr).is_empty()
        }
    }

    async fn apply(
        &self,
        ctx: &RemediationContext<'_>,
        pr: &mut PullRequest,
    ) -> Result<String, HostingApiError> {
        if ctx.ledger.is_marked(pr, GuardianLabel::SecretViolation) {
            ctx.ledger
                .clear(ctx.client, ctx.repository, pr, GuardianLabel::SecretViolation)
                .await?;
            return Ok("secret scans pass again, cleared secret-violation".to_string());
        }

        let (body, names) = {
            let failed = Self::failed_scans(ctx, pr);
            let names = failed
                .iter()
                .map(|check| check.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            (comments::secret_violation(&failed), names)
        };

        ctx.ledger
            .mark(ctx.client, ctx.repository, pr, GuardianLabel::SecretViolation)
            .await?;
        comment(ctx, pr, &body).await?;

        Ok(format!("flagged failed secret scan ({})", names))
    }
}

/// Brings branches that are behind or conflicting up to date with their base
pub struct BranchSyncRule;

#[async_trait]
impl RemediationRule for BranchSyncRule {
    fn kind(&self) -> ActionKind {
        ActionKind::BranchSync
    }

    fn applies(&self, ctx: &RemediationContext<'_>, pr: &PullRequest) -> bool {
        matches!(
            pr.merge_state_status,
            MergeStateStatus::Behind | MergeStateStatus::Dirty
        ) && !ctx.ledger.is_marked(pr, GuardianLabel::AutoUpdated)
    }

    async fn apply(
        &self,
        ctx: &RemediationContext<'_>,
        pr: &mut PullRequest,
    ) -> Result<String, HostingApiError> {
        let strategy = ctx
            .client
            .update_pull_request_branch(&ctx.repository.owner, &ctx.repository.name, pr)
            .await?;

        ctx.ledger
            .mark(ctx.client, ctx.repository, pr, GuardianLabel::AutoUpdated)
            .await?;
        ctx.schedule_episode_end(pr.number, GuardianLabel::AutoUpdated);

        let body = comments::branch_synced(&pr.base_branch, strategy, ctx.settings.sync_cooldown);
        comment(ctx, pr, &body).await?;

        Ok(format!("synced with '{}' via {}", pr.base_branch, strategy))
    }
}

/// Reruns failed checks once per failure episode
pub struct CheckRerunRule;

#[async_trait]
impl RemediationRule for CheckRerunRule {
    fn kind(&self) -> ActionKind {
        ActionKind::CheckRerun
    }

    fn applies(&self, ctx: &RemediationContext<'_>, pr: &PullRequest) -> bool {
        ctx.settings.max_retries > 0
            && pr.checks.iter().any(CheckRun::has_failed)
            && !ctx.ledger.is_marked(pr, GuardianLabel::RerunAttempted)
    }

    async fn apply(
        &self,
        ctx: &RemediationContext<'_>,
        pr: &mut PullRequest,
    ) -> Result<String, HostingApiError> {
        let targets: Vec<(u64, String)> = pr
            .checks
            .iter()
            .filter(|check| check.has_failed())
            .take(ctx.settings.max_retries)
            .map(|check| (check.id, check.name.clone()))
            .collect();

        let mut rerun = Vec::new();
        let mut last_error = None;
        for (id, name) in targets {
            match ctx
                .client
                .rerun_check_run(&ctx.repository.owner, &ctx.repository.name, pr.number, id)
                .await
            {
                Ok(()) => rerun.push(name),
                Err(e) => {
                    log::warn!("{}", e);
                    last_error = Some(e);
                }
            }
        }

        // Nothing was rerun, so the episode has not started
        if let (true, Some(e)) = (rerun.is_empty(), last_error) {
            return Err(e);
        }

        ctx.ledger
            .mark(ctx.client, ctx.repository, pr, GuardianLabel::RerunAttempted)
            .await?;
        ctx.schedule_episode_end(pr.number, GuardianLabel::RerunAttempted);

        let body = comments::checks_rerun(&rerun, ctx.settings.rerun_cooldown);
        comment(ctx, pr, &body).await?;

        Ok(format!("reran {}", rerun.join(", ")))
    }
}

/// Enables auto-merge on mergeable PRs without blocking checks
///
/// Not label-gated; `has_auto_merge` on the snapshot makes it idempotent.
pub struct AutoMergeRule;

#[async_trait]
impl RemediationRule for AutoMergeRule {
    fn kind(&self) -> ActionKind {
        ActionKind::AutoMerge
    }

    fn applies(&self, _ctx: &RemediationContext<'_>, pr: &PullRequest) -> bool {
        !pr.has_auto_merge
            && pr.mergeable == Mergeable::Mergeable
            && !pr.checks.iter().any(CheckRun::has_failed)
    }

    async fn apply(
        &self,
        ctx: &RemediationContext<'_>,
        pr: &mut PullRequest,
    ) -> Result<String, HostingApiError> {
        let method = ctx.settings.merge_method;
        ctx.client
            .enable_auto_merge(&ctx.repository.owner, &ctx.repository.name, pr, method)
            .await?;
        pr.has_auto_merge = true;

        Ok(format!(
            "enabled auto-merge ({})",
            method.as_graphql().to_lowercase()
        ))
    }
}

/// Marks PRs open for longer than `stale_after`
pub struct StalenessRule;

#[async_trait]
impl RemediationRule for StalenessRule {
    fn kind(&self) -> ActionKind {
        ActionKind::Staleness
    }

    fn applies(&self, ctx: &RemediationContext<'_>, pr: &PullRequest) -> bool {
        pr.age(ctx.now) > ctx.settings.stale_after
            && !ctx.ledger.is_marked(pr, GuardianLabel::Stale)
    }

    async fn apply(
        &self,
        ctx: &RemediationContext<'_>,
        pr: &mut PullRequest,
    ) -> Result<String, HostingApiError> {
        let age_days = pr.age(ctx.now).num_days();

        ctx.ledger
            .mark(ctx.client, ctx.repository, pr, GuardianLabel::Stale)
            .await?;
        let body = comments::stale_warning(age_days, ctx.settings.stale_after.num_days());
        comment(ctx, pr, &body).await?;

        Ok(format!("marked stale after {} days", age_days))
    }
}
