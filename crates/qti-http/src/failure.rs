//! Response classification.

use crate::error::{is_authorization_status, IneligibleReason};

/// What the pipeline should do with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// 2xx.
    Success,
    /// First-attempt 401/403 with a refresh token on hand. Still needs the
    /// refresh gate before a refresh may start.
    RefreshCandidate,
    /// First-attempt 401/403 that cannot be retried.
    Ineligible(IneligibleReason),
    /// 401/403 on the replay.
    FailedAfterRetry,
    /// Any other status.
    Failed,
}

/// Classify a response status for a request.
pub fn classify(status: u16, retried: bool, has_refresh_token: bool) -> Verdict {
    if (200..300).contains(&status) {
        return Verdict::Success;
    }
    if !is_authorization_status(status) {
        return Verdict::Failed;
    }
    if retried {
        return Verdict::FailedAfterRetry;
    }
    if !has_refresh_token {
        return Verdict::Ineligible(IneligibleReason::NoRefreshToken);
    }
    Verdict::RefreshCandidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert_eq!(classify(200, false, false), Verdict::Success);
        assert_eq!(classify(204, true, true), Verdict::Success);
        assert_eq!(classify(302, false, true), Verdict::Failed);
    }

    #[test]
    fn test_auth_failures() {
        assert_eq!(classify(401, false, true), Verdict::RefreshCandidate);
        assert_eq!(classify(403, false, true), Verdict::RefreshCandidate);
        assert_eq!(classify(401, true, true), Verdict::FailedAfterRetry);
        assert_eq!(
            classify(403, false, false),
            Verdict::Ineligible(IneligibleReason::NoRefreshToken)
        );
    }

    #[test]
    fn test_other_failures_never_retry() {
        for status in [400, 404, 409, 500, 503] {
            assert_eq!(classify(status, false, true), Verdict::Failed);
        }
    }
}
