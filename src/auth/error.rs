use std::time::Duration;

/// Failures surfaced by [`SessionStore`](super::SessionStore) operations.
///
/// Malformed persisted data is not an error: it reads as an empty session or
/// ledger.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No ledger entry matches the email + secret pair.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Another register/authenticate call is still in flight.
    #[error("Another authentication request is already in progress")]
    Busy,

    /// A required input was empty.
    #[error("{0} cannot be empty")]
    MissingField(&'static str),

    /// Only returned under `duplicate_email = "reject"`.
    #[error("Email '{0}' is already registered")]
    EmailTaken(String),

    #[error("Unknown role '{0}'. Supported values: ngo, donor, auditor")]
    UnknownRole(String),

    /// The transport round trip exceeded `auth.request_timeout_ms`.
    #[error("Authentication request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Authentication request was cancelled")]
    Cancelled,

    #[error("Authentication transport failed: {0:#}")]
    Transport(anyhow::Error),

    #[error("Failed to hash secret: {0}")]
    Hashing(String),

    /// A storage read or write failed. Malformed content is not this.
    #[error("Auth storage failed: {0:#}")]
    Storage(anyhow::Error),
}

impl AuthError {
    /// Whether resubmitting the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Busy | Self::Timeout(_) | Self::Cancelled | Self::Transport(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_reports_millis() {
        let err = AuthError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "Authentication request timed out after 1500ms");
    }

    #[test]
    fn credential_failures_are_not_retryable() {
        assert!(!AuthError::InvalidCredentials.is_retryable());
        assert!(!AuthError::MissingField("email").is_retryable());
        assert!(AuthError::Busy.is_retryable());
        assert!(AuthError::Cancelled.is_retryable());
    }

    #[test]
    fn transport_error_includes_cause_chain() {
        let cause = anyhow::anyhow!("connection refused").context("POST /login");
        let err = AuthError::Transport(cause);
        assert_eq!(
            err.to_string(),
            "Authentication transport failed: POST /login: connection refused"
        );
    }
}
