//! Guardian labels
//!
//! The four sticky labels are the only state the guardian keeps on GitHub.
//! Each one marks an action as already attempted for the current episode.

use gh_client::{GitHubClient, HostingApiError, LabelSpec};
use gh_pr_guardian_config::RepositoryRef;
use std::fmt;
use std::time::Duration;

/// A sticky label used as idempotency marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GuardianLabel {
    RerunAttempted,
    SecretViolation,
    AutoUpdated,
    Stale,
}

impl GuardianLabel {
    /// All labels, in the order they are created on the repository
    pub const ALL: [GuardianLabel; 4] = [
        GuardianLabel::RerunAttempted,
        GuardianLabel::SecretViolation,
        GuardianLabel::AutoUpdated,
        GuardianLabel::Stale,
    ];

    /// Label name as seen on GitHub
    pub fn name(&self) -> &'static str {
        match self {
            GuardianLabel::RerunAttempted => "rerun-attempted",
            GuardianLabel::SecretViolation => "secret-violation",
            GuardianLabel::AutoUpdated => "auto-updated",
            GuardianLabel::Stale => "stale",
        }
    }

    fn color(&self) -> &'static str {
        match self {
            GuardianLabel::RerunAttempted => "fbca04",
            GuardianLabel::SecretViolation => "b60205",
            GuardianLabel::AutoUpdated => "0e8a16",
            GuardianLabel::Stale => "cfd3d7",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            GuardianLabel::RerunAttempted => "Failed checks were rerun once by the guardian",
            GuardianLabel::SecretViolation => "Secret scanning failed; needs manual remediation",
            GuardianLabel::AutoUpdated => "Branch was synced with its base by the guardian",
            GuardianLabel::Stale => "No activity for a long time; may be closed",
        }
    }

    /// Repository label definition
    pub fn spec(&self) -> LabelSpec {
        LabelSpec {
            name: self.name().to_string(),
            color: self.color().to_string(),
            description: self.description().to_string(),
        }
    }

    /// Episode length, None if the label never expires on its own
    pub fn episode(&self, rerun_cooldown: Duration, sync_cooldown: Duration) -> Option<Duration> {
        match self {
            GuardianLabel::RerunAttempted => Some(rerun_cooldown),
            GuardianLabel::AutoUpdated => Some(sync_cooldown),
            GuardianLabel::SecretViolation | GuardianLabel::Stale => None,
        }
    }
}

impl fmt::Display for GuardianLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Create every guardian label missing on the repository
///
/// Returns the labels that were created. With `dry_run` nothing is created
/// and the missing labels are only reported.
pub async fn ensure_guardian_labels(
    client: &dyn GitHubClient,
    repository: &RepositoryRef,
    dry_run: bool,
) -> Result<Vec<GuardianLabel>, HostingApiError> {
    let existing = client
        .fetch_repository_labels(&repository.owner, &repository.name)
        .await?;

    // GitHub refuses a label that differs from an existing one only in case
    let missing: Vec<GuardianLabel> = GuardianLabel::ALL
        .into_iter()
        .filter(|label| !existing.iter().any(|name| name.eq_ignore_ascii_case(label.name())))
        .collect();

    for label in &missing {
        if dry_run {
            log::info!("[dry-run] Would create label '{}' on {}", label, repository);
            continue;
        }
        client
            .create_label(&repository.owner, &repository.name, &label.spec())
            .await?;
        log::info!("Created label '{}' on {}", label, repository);
    }

    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{Call, FakeGitHub};
    use gh_client::ApiOperation;

    fn repo() -> RepositoryRef {
        RepositoryRef::new("acme", "widgets")
    }

    #[test]
    fn test_label_names() {
        let names: Vec<&str> = GuardianLabel::ALL.iter().map(|l| l.name()).collect();
        assert_eq!(
            names,
            vec!["rerun-attempted", "secret-violation", "auto-updated", "stale"]
        );
        assert_eq!(GuardianLabel::Stale.spec().name, "stale");
    }

    #[test]
    fn test_episodes() {
        let rerun = Duration::from_secs(7200);
        let sync = Duration::from_secs(3600);
        assert_eq!(GuardianLabel::RerunAttempted.episode(rerun, sync), Some(rerun));
        assert_eq!(GuardianLabel::AutoUpdated.episode(rerun, sync), Some(sync));
        assert_eq!(GuardianLabel::SecretViolation.episode(rerun, sync), None);
        assert_eq!(GuardianLabel::Stale.episode(rerun, sync), None);
    }

    #[tokio::test]
    async fn test_ensure_creates_only_missing_labels() {
        let fake = FakeGitHub::new().with_repository_labels(&["bug", "stale", "auto-updated"]);

        let created = ensure_guardian_labels(&fake, &repo(), false).await.unwrap();

        assert_eq!(
            created,
            vec![GuardianLabel::RerunAttempted, GuardianLabel::SecretViolation]
        );
        assert_eq!(
            fake.calls_matching(|c| matches!(c, Call::CreateLabel(_))),
            vec![
                Call::CreateLabel("rerun-attempted".to_string()),
                Call::CreateLabel("secret-violation".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_ensure_accepts_labels_in_other_case() {
        let fake = FakeGitHub::new().with_repository_labels(&[
            "Rerun-Attempted",
            "SECRET-VIOLATION",
            "auto-updated",
            "Stale",
        ]);

        let created = ensure_guardian_labels(&fake, &repo(), false).await.unwrap();

        assert!(created.is_empty());
        assert!(fake.calls_matching(|c| matches!(c, Call::CreateLabel(_))).is_empty());
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let fake = FakeGitHub::new();

        ensure_guardian_labels(&fake, &repo(), false).await.unwrap();
        let second = ensure_guardian_labels(&fake, &repo(), false).await.unwrap();

        assert!(second.is_empty());
        assert_eq!(fake.calls_matching(|c| matches!(c, Call::CreateLabel(_))).len(), 4);
    }

    #[tokio::test]
    async fn test_ensure_dry_run_creates_nothing() {
        let fake = FakeGitHub::new();

        let missing = ensure_guardian_labels(&fake, &repo(), true).await.unwrap();

        assert_eq!(missing.len(), 4);
        assert!(fake.calls_matching(|c| matches!(c, Call::CreateLabel(_))).is_empty());
    }

    #[tokio::test]
    async fn test_ensure_propagates_listing_failure() {
        let fake = FakeGitHub::new().failing(ApiOperation::ListLabels);

        let err = ensure_guardian_labels(&fake, &repo(), false).await.unwrap_err();

        assert_eq!(err.operation, ApiOperation::ListLabels);
    }
}
