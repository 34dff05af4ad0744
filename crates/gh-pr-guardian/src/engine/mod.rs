//! Remediation engine
//!
//! Evaluates a fixed, ordered list of rules against one PR snapshot. Rules
//! are independent: a failing rule is logged and the next one still runs.
//!
//! ```text
//! snapshot ──▶ secret-violation ──▶ branch sync ──▶ check rerun ──▶ auto-merge ──▶ stale
//! ```

pub mod comments;
pub mod rules;

use crate::labels::GuardianLabel;
use crate::ledger::Ledger;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gh_client::{GitHubClient, HostingApiError, MergeMethod, PullRequest};
use gh_pr_guardian_config::{GuardianConfig, RepositoryRef};
use regex::{RegexSet, RegexSetBuilder};
use std::fmt;
use std::time::Duration;

pub use rules::{
    AutoMergeRule, BranchSyncRule, CheckRerunRule, SecretViolationRule, StalenessRule,
};

/// Tunables of the remediation rules
#[derive(Debug, Clone)]
pub struct RemediationSettings {
    pub stale_after: chrono::Duration,
    pub max_retries: usize,
    pub rerun_cooldown: Duration,
    pub sync_cooldown: Duration,
    pub secret_scan: RegexSet,
    pub auto_clear_secret_violation: bool,
    pub merge_method: MergeMethod,
    pub dry_run: bool,
}

impl RemediationSettings {
    /// Build settings from the loaded configuration
    ///
    /// Fails if a secret-scan pattern is not a valid regex.
    pub fn from_config(config: &GuardianConfig) -> Result<Self, regex::Error> {
        let secret_scan = RegexSetBuilder::new(&config.secret_scan_patterns)
            .case_insensitive(true)
            .build()?;

        Ok(Self {
            stale_after: chrono::Duration::days(i64::from(config.stale_after_days)),
            max_retries: config.max_retries,
            rerun_cooldown: config.rerun_cooldown(),
            sync_cooldown: config.sync_cooldown(),
            secret_scan,
            auto_clear_secret_violation: config.auto_clear_secret_violation,
            merge_method: config.merge_method,
            dry_run: config.dry_run,
        })
    }

    /// Whether a check with this name is a secret scan
    pub fn is_secret_scan(&self, check_name: &str) -> bool {
        self.secret_scan.is_match(check_name)
    }
}

/// Everything a rule needs besides the snapshot
pub struct RemediationContext<'a> {
    pub client: &'a dyn GitHubClient,
    pub repository: &'a RepositoryRef,
    pub ledger: &'a Ledger,
    pub settings: &'a RemediationSettings,
    pub now: DateTime<Utc>,
}

impl RemediationContext<'_> {
    /// Schedule the end of the label's episode, if it has one
    pub fn schedule_episode_end(&self, pr_number: u64, label: GuardianLabel) {
        let episode = label.episode(self.settings.rerun_cooldown, self.settings.sync_cooldown);
        let Some(episode) = episode else {
            return;
        };
        match chrono::Duration::from_std(episode) {
            Ok(episode) => self.ledger.schedule_expiry(pr_number, label, self.now + episode),
            Err(e) => log::warn!("PR #{}: cannot schedule '{}' expiry: {}", pr_number, label, e),
        }
    }
}

/// The kind of corrective action a rule performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    SecretViolation,
    BranchSync,
    CheckRerun,
    AutoMerge,
    Staleness,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::SecretViolation => "secret-violation flagging",
            ActionKind::BranchSync => "branch sync",
            ActionKind::CheckRerun => "check rerun",
            ActionKind::AutoMerge => "auto-merge",
            ActionKind::Staleness => "stale marking",
        };
        f.write_str(name)
    }
}

/// What happened to an applicable rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    /// Performed; carries a short description
    Applied(String),
    /// Would have been performed (dry run)
    Planned,
    /// Failed; carries the error message
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub pr_number: u64,
    pub kind: ActionKind,
    pub result: ActionResult,
}

/// A remediation rule
///
/// `applies` only looks at the snapshot; `apply` performs the calls and
/// updates the snapshot with the labels it added.
#[async_trait]
pub trait RemediationRule: Send + Sync {
    fn kind(&self) -> ActionKind;

    fn applies(&self, ctx: &RemediationContext<'_>, pr: &PullRequest) -> bool;

    async fn apply(
        &self,
        ctx: &RemediationContext<'_>,
        pr: &mut PullRequest,
    ) -> Result<String, HostingApiError>;
}

pub struct RemediationEngine {
    rules: Vec<Box<dyn RemediationRule>>,
}

impl Default for RemediationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RemediationEngine {
    /// Engine with the built-in rules in priority order
    pub fn new() -> Self {
        Self::with_rules(vec![
            Box::new(SecretViolationRule),
            Box::new(BranchSyncRule),
            Box::new(CheckRerunRule),
            Box::new(AutoMergeRule),
            Box::new(StalenessRule),
        ])
    }

    pub fn with_rules(rules: Vec<Box<dyn RemediationRule>>) -> Self {
        Self { rules }
    }

    /// Rule kinds in evaluation order
    pub fn kinds(&self) -> Vec<ActionKind> {
        self.rules.iter().map(|rule| rule.kind()).collect()
    }

    /// Evaluate every rule against the PR
    ///
    /// Drafts are never touched. Returns one report per applicable rule.
    pub async fn remediate(
        &self,
        ctx: &RemediationContext<'_>,
        pr: &mut PullRequest,
    ) -> Vec<ActionReport> {
        if pr.is_draft {
            log::debug!("PR #{}: draft, no remediation", pr.number);
            return Vec::new();
        }

        let mut reports = Vec::new();
        for rule in &self.rules {
            if !rule.applies(ctx, pr) {
                continue;
            }

            let result = if ctx.settings.dry_run {
                log::info!("[dry-run] PR #{}: would run {}", pr.number, rule.kind());
                ActionResult::Planned
            } else {
                match rule.apply(ctx, pr).await {
                    Ok(detail) => {
                        log::info!("PR #{}: {}", pr.number, detail);
                        ActionResult::Applied(detail)
                    }
                    Err(e) => {
                        log::error!("PR #{}: {} failed: {}", pr.number, rule.kind(), e);
                        ActionResult::Failed(e.to_string())
                    }
                }
            };

            reports.push(ActionReport {
                pr_number: pr.number,
                kind: rule.kind(),
                result,
            });
        }

        reports
    }
}
