//! Run orchestrator
//!
//! One run: wait for API quota → expire due labels → ensure labels exist →
//! collect snapshots → remediate each PR in listing order → persist ledger.

use crate::collector::collect;
use crate::engine::{
    ActionReport, ActionResult, RemediationContext, RemediationEngine, RemediationSettings,
};
use crate::error::GuardianError;
use crate::governor::RateGovernor;
use crate::labels::ensure_guardian_labels;
use crate::ledger::Ledger;
use anyhow::Context;
use chrono::Utc;
use gh_client::GitHubClient;
use gh_pr_guardian_config::{GuardianConfig, RepositoryRef};
use std::fmt;

/// Counts of what a run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub listed: usize,
    pub processed: usize,
    pub drafts_skipped: usize,
    pub collection_failures: usize,
    pub labels_created: usize,
    pub labels_expired: usize,
    pub applied: usize,
    pub failed: usize,
    pub planned: usize,
    pub reports: Vec<ActionReport>,
}

impl RunSummary {
    fn record(&mut self, reports: Vec<ActionReport>) {
        for report in &reports {
            match report.result {
                ActionResult::Applied(_) => self.applied += 1,
                ActionResult::Planned => self.planned += 1,
                ActionResult::Failed(_) => self.failed += 1,
            }
        }
        self.reports.extend(reports);
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Run complete: {} of {} open PRs processed ({} drafts skipped, {} failed to load); \
             actions: {} applied, {} failed",
            self.processed,
            self.listed,
            self.drafts_skipped,
            self.collection_failures,
            self.applied,
            self.failed
        )?;
        if self.planned > 0 {
            write!(f, ", {} planned", self.planned)?;
        }
        Ok(())
    }
}

pub struct Guardian<C: GitHubClient> {
    client: C,
    repository: RepositoryRef,
    settings: RemediationSettings,
    ledger: Ledger,
    governor: RateGovernor,
    engine: RemediationEngine,
}

impl<C: GitHubClient> Guardian<C> {
    pub fn new(
        client: C,
        repository: RepositoryRef,
        settings: RemediationSettings,
        ledger: Ledger,
        governor: RateGovernor,
    ) -> Self {
        Self {
            client,
            repository,
            settings,
            ledger,
            governor,
            engine: RemediationEngine::new(),
        }
    }

    /// Build a guardian from the loaded configuration
    ///
    /// The ledger is read from `ledger_path` or the per-repository file in the
    /// cache directory.
    pub fn from_config(client: C, config: &GuardianConfig) -> anyhow::Result<Self> {
        let repository = config
            .repository()
            .context("Invalid repository setting")?;
        let settings = RemediationSettings::from_config(config)
            .context("Invalid secret scan pattern")?;
        let ledger_path = match &config.ledger_path {
            Some(path) => path.clone(),
            None => gh_pr_guardian_config::ledger_path(&repository.owner, &repository.name)?,
        };
        let governor =
            RateGovernor::new(config.rate_limit_threshold, config.max_rate_limit_wait());

        Ok(Self::new(
            client,
            repository,
            settings,
            Ledger::load(ledger_path),
            governor,
        ))
    }

    pub fn repository(&self) -> &RepositoryRef {
        &self.repository
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Perform one full run once the API quota allows it
    ///
    /// Only failing to set up labels or to list PRs is an error.
    pub async fn run(&self) -> Result<RunSummary, GuardianError> {
        self.governor.guard(&self.client, self.run_once()).await
    }

    async fn run_once(&self) -> Result<RunSummary, GuardianError> {
        let result = self.remediate_all().await;

        if !self.settings.dry_run {
            if let Err(e) = self.ledger.save() {
                log::warn!("Failed to save ledger: {:#}", e);
            }
        }

        result
    }

    async fn remediate_all(&self) -> Result<RunSummary, GuardianError> {
        let dry_run = self.settings.dry_run;
        let now = Utc::now();
        let mut summary = RunSummary::default();

        if dry_run {
            log::info!("Dry run: no changes will be made to {}", self.repository);
        } else {
            let sweep = self
                .ledger
                .sweep_expired(&self.client, &self.repository, now)
                .await;
            summary.labels_expired = sweep.removed;
        }

        let created = ensure_guardian_labels(&self.client, &self.repository, dry_run)
            .await
            .map_err(GuardianError::LabelSetup)?;
        summary.labels_created = created.len();

        let collection = collect(&self.client, &self.repository)
            .await
            .map_err(GuardianError::Enumeration)?;
        summary.listed = collection.listed;
        summary.drafts_skipped = collection.drafts_skipped;
        summary.collection_failures = collection.failed.len();

        let ctx = RemediationContext {
            client: &self.client,
            repository: &self.repository,
            ledger: &self.ledger,
            settings: &self.settings,
            now,
        };

        for mut pr in collection.snapshots {
            let reports = self.engine.remediate(&ctx, &mut pr).await;
            summary.processed += 1;
            summary.record(reports);
        }

        Ok(summary)
    }
}
