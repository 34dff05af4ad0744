//! Pull request guardian
//!
//! A scheduled control loop that inspects every open pull request of one
//! repository and applies idempotent corrective actions: branch sync, a
//! single rerun of failed checks, secret-scan flagging, auto-merge
//! enablement and stale marking. Labels on the PR record what was already
//! attempted.
//!
//! ```text
//! Guardian::run
//!   └─ RateGovernor::guard
//!        ├─ Ledger::sweep_expired
//!        ├─ ensure_guardian_labels
//!        ├─ collector::collect
//!        └─ RemediationEngine::remediate (per PR)
//! ```

pub mod collector;
pub mod engine;
pub mod error;
pub mod governor;
pub mod labels;
pub mod ledger;
pub mod logger;
pub mod orchestrator;

#[cfg(test)]
mod test_utils;

pub use engine::{ActionKind, ActionReport, ActionResult, RemediationEngine, RemediationSettings};
pub use error::GuardianError;
pub use governor::RateGovernor;
pub use labels::GuardianLabel;
pub use ledger::Ledger;
pub use orchestrator::{Guardian, RunSummary};
