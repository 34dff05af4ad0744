//! Errors that abort a guardian run

use gh_client::HostingApiError;
use thiserror::Error;

/// A failure that ends the run with a non-zero exit code
///
/// Failures of single PRs or single actions are never turned into this
/// error; they are logged and reported in the run summary.
#[derive(Debug, Error)]
pub enum GuardianError {
    /// The guardian labels could not be listed or created
    #[error("failed to set up guardian labels: {0}")]
    LabelSetup(#[source] HostingApiError),

    /// The open pull requests could not be listed
    #[error("failed to enumerate pull requests: {0}")]
    Enumeration(#[source] HostingApiError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use gh_client::ApiOperation;

    #[test]
    fn test_error_messages() {
        let err = GuardianError::Enumeration(HostingApiError::new(
            ApiOperation::ListPullRequests,
            "502 Bad Gateway",
        ));
        assert_eq!(
            err.to_string(),
            "failed to enumerate pull requests: list pull requests failed: 502 Bad Gateway"
        );
    }
}
