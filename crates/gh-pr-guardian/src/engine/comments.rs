//! Comment bodies posted by the remediation rules
//!
//! Every body starts with a hidden marker naming the rule, so guardian
//! comments can be told apart from human ones.

use gh_client::{BranchUpdateStrategy, CheckRun};
use std::time::Duration;

fn marker(kind: &str) -> String {
    format!("<!-- gh-pr-guardian:{} -->", kind)
}

fn humanize(duration: Duration) -> String {
    let minutes = duration.as_secs() / 60;
    match minutes {
        0 => format!("{} seconds", duration.as_secs()),
        m if m % 60 == 0 && m / 60 == 1 => "1 hour".to_string(),
        m if m % 60 == 0 => format!("{} hours", m / 60),
        1 => "1 minute".to_string(),
        m => format!("{} minutes", m),
    }
}

/// Alert for failed secret scans
pub fn secret_violation(failed_scans: &[&CheckRun]) -> String {
    let checks = failed_scans
        .iter()
        .map(|check| format!("- `{}`", check.name))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{marker}\n\
         ## :rotating_light: Secret scan failed\n\n\
         The following secret scanning checks reported a finding:\n\n\
         {checks}\n\n\
         **Required steps**\n\n\
         1. Revoke and rotate every exposed credential right away. Removing it from the branch is not enough.\n\
         2. Remove the secret from the commit history, for example by rewriting the affected commits and force-pushing.\n\
         3. Load the credential from the environment or a secret store instead of the code.\n\
         4. Once the scan passes, a maintainer removes the `secret-violation` label.\n",
        marker = marker("secret-violation"),
        checks = checks,
    )
}

/// Notification after the branch was synced with its base
pub fn branch_synced(
    base_branch: &str,
    strategy: BranchUpdateStrategy,
    cooldown: Duration,
) -> String {
    format!(
        "{marker}\n\
         :arrows_counterclockwise: This branch was out of date with `{base}` and has been updated ({strategy}).\n\n\
         The branch will not be synced again for the next {cooldown}.\n",
        marker = marker("branch-sync"),
        base = base_branch,
        strategy = strategy,
        cooldown = humanize(cooldown),
    )
}

/// Notification after failed checks were rerun
pub fn checks_rerun(rerun: &[String], cooldown: Duration) -> String {
    let checks = rerun
        .iter()
        .map(|name| format!("- `{}`", name))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{marker}\n\
         :repeat: Failed checks were rerun once:\n\n\
         {checks}\n\n\
         If they fail again, please take a look. No further automatic rerun happens for the next {cooldown}.\n",
        marker = marker("check-rerun"),
        checks = checks,
        cooldown = humanize(cooldown),
    )
}

/// Warning that a PR is stale and may be closed
pub fn stale_warning(age_days: i64, stale_after_days: i64) -> String {
    format!(
        "{marker}\n\
         :hourglass: This pull request was opened {age} days ago, which is more than the {limit} days we keep PRs open.\n\n\
         It may be closed soon. Push an update or leave a comment if it is still relevant, \
         and remove the `stale` label.\n",
        marker = marker("stale"),
        age = age_days,
        limit = stale_after_days,
    )
}
