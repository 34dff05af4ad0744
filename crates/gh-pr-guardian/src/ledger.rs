//! Idempotency ledger
//!
//! Labels on the PR record which actions were already attempted. A label is
//! only added when missing, so repeated runs never duplicate an action.
//!
//! Episodes are closed by removing the label again after a cool-down. The
//! removal deadlines are kept in a small TOML file and executed by the sweep
//! at the start of the next run; a lost file only delays the next retry.

use crate::labels::GuardianLabel;
use chrono::{DateTime, Utc};
use gh_client::{GitHubClient, HostingApiError, PullRequest};
use gh_pr_guardian_config::RepositoryRef;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A scheduled label removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expiry {
    pub pr_number: u64,
    pub label: String,
    pub due_at: DateTime<Utc>,
}

/// Persisted ledger content
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerState {
    #[serde(default)]
    pub expiries: Vec<Expiry>,
}

/// Outcome of a sweep over due expiries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Labels removed from PRs
    pub removed: usize,
    /// Entries dropped because the label was already gone
    pub already_gone: usize,
    /// Removals that failed and stay scheduled
    pub failed: usize,
}

pub struct Ledger {
    state: Mutex<LedgerState>,
    path: Option<PathBuf>,
}

impl Ledger {
    /// Ledger that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            path: None,
        }
    }

    /// Load the ledger from `path`; a missing or broken file yields an empty ledger
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match Self::read_state(&path) {
            Ok(Some(state)) => {
                log::debug!(
                    "Loaded {} pending label expiries from {:?}",
                    state.expiries.len(),
                    path
                );
                state
            }
            Ok(None) => LedgerState::default(),
            Err(e) => {
                log::warn!("Ignoring unreadable ledger {:?}: {}", path, e);
                LedgerState::default()
            }
        };

        Self {
            state: Mutex::new(state),
            path: Some(path),
        }
    }

    fn read_state(path: &Path) -> anyhow::Result<Option<LedgerState>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(toml::from_str(&content)?))
    }

    /// Write pending expiries back to disk (no-op for in-memory ledgers)
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content = {
            let state = self.state.lock().unwrap();
            toml::to_string_pretty(&*state)?
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        log::debug!("Saved ledger to {:?}", path);
        Ok(())
    }

    /// Whether the PR already carries the label
    pub fn is_marked(&self, pr: &PullRequest, label: GuardianLabel) -> bool {
        pr.has_label(label.name())
    }

    /// Add the label to the PR unless it is already present
    ///
    /// The snapshot is updated too, so evaluating it again is a no-op.
    /// Returns true if the label was added.
    pub async fn mark(
        &self,
        client: &dyn GitHubClient,
        repository: &RepositoryRef,
        pr: &mut PullRequest,
        label: GuardianLabel,
    ) -> Result<bool, HostingApiError> {
        if self.is_marked(pr, label) {
            return Ok(false);
        }
        client
            .add_label(&repository.owner, &repository.name, pr.number, label.name())
            .await?;
        pr.labels.insert(label.name().to_string());
        log::info!("PR #{}: added label '{}'", pr.number, label);
        Ok(true)
    }

    /// Remove the label from the PR now
    pub async fn clear(
        &self,
        client: &dyn GitHubClient,
        repository: &RepositoryRef,
        pr: &mut PullRequest,
        label: GuardianLabel,
    ) -> Result<(), HostingApiError> {
        if !self.is_marked(pr, label) {
            return Ok(());
        }
        client
            .remove_label(&repository.owner, &repository.name, pr.number, label.name())
            .await?;
        pr.remove_label(label.name());
        self.forget(pr.number, label);
        log::info!("PR #{}: removed label '{}'", pr.number, label);
        Ok(())
    }

    /// Schedule removal of a label, replacing an earlier deadline
    pub fn schedule_expiry(&self, pr_number: u64, label: GuardianLabel, due_at: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        state
            .expiries
            .retain(|e| !(e.pr_number == pr_number && e.label == label.name()));
        state.expiries.push(Expiry {
            pr_number,
            label: label.name().to_string(),
            due_at,
        });
        log::debug!("PR #{}: '{}' expires at {}", pr_number, label, due_at);
    }

    /// Scheduled removals that have not run yet
    pub fn pending(&self) -> Vec<Expiry> {
        self.state.lock().unwrap().expiries.clone()
    }

    fn forget(&self, pr_number: u64, label: GuardianLabel) {
        self.state
            .lock()
            .unwrap()
            .expiries
            .retain(|e| !(e.pr_number == pr_number && e.label == label.name()));
    }

    /// Remove every label whose deadline has passed
    ///
    /// Failed removals stay scheduled and are retried on the next sweep.
    pub async fn sweep_expired(
        &self,
        client: &dyn GitHubClient,
        repository: &RepositoryRef,
        now: DateTime<Utc>,
    ) -> SweepReport {
        let due: Vec<Expiry> = self
            .state
            .lock()
            .unwrap()
            .expiries
            .iter()
            .filter(|e| e.due_at <= now)
            .cloned()
            .collect();

        let mut report = SweepReport::default();
        for expiry in due {
            let result = client
                .remove_label(
                    &repository.owner,
                    &repository.name,
                    expiry.pr_number,
                    &expiry.label,
                )
                .await;

            match result {
                Ok(()) => {
                    log::info!(
                        "PR #{}: label '{}' expired and was removed",
                        expiry.pr_number,
                        expiry.label
                    );
                    report.removed += 1;
                }
                Err(e) if e.is_not_found() => {
                    log::debug!(
                        "PR #{}: label '{}' already gone",
                        expiry.pr_number,
                        expiry.label
                    );
                    report.already_gone += 1;
                }
                Err(e) => {
                    log::warn!("Label expiry postponed: {}", e);
                    report.failed += 1;
                    continue;
                }
            }

            self.state.lock().unwrap().expiries.retain(|e| *e != expiry);
        }

        report
    }
}
