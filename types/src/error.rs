use thiserror::Error;

use crate::SessionId;

/// Malformed input caught before anything is sent to the lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("IMEI must be exactly 15 digits")]
    MalformedIdentifier,
    #[error("challenge text must not be empty")]
    EmptyChallengeText,
    #[error("no challenge is waiting for an answer")]
    NoActiveChallenge,
    #[error("session {0} is not the active session")]
    StaleSession(SessionId),
    #[error("a verification session is already active; reset it first")]
    SessionActive,
}

/// Message used when the service gave no detail of its own.
pub const SERVICE_UNREACHABLE: &str = "Lookup service unreachable. Is the server running?";

const MAX_DETAIL_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// Connection, DNS, TLS or timeout failure.
    Transport,
    /// Non-success HTTP status.
    Http,
    /// Success status but the body did not match the contract.
    Decode,
    /// The client could not be constructed from its configuration.
    Config,
}

/// Failure talking to the lookup service.
///
/// `Display` is the user-facing message: the service's own `detail` when it
/// sent one, otherwise [`SERVICE_UNREACHABLE`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ServiceError {
    kind: ServiceErrorKind,
    status: Option<u16>,
    message: String,
}

impl ServiceError {
    #[must_use]
    pub fn transport() -> Self {
        Self {
            kind: ServiceErrorKind::Transport,
            status: None,
            message: SERVICE_UNREACHABLE.to_string(),
        }
    }

    /// Error for a non-success response. A blank `detail` falls back to the
    /// generic message.
    #[must_use]
    pub fn http(status: u16, detail: Option<&str>) -> Self {
        let message = detail
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map_or_else(|| SERVICE_UNREACHABLE.to_string(), truncate_detail);
        Self {
            kind: ServiceErrorKind::Http,
            status: Some(status),
            message,
        }
    }

    #[must_use]
    pub fn decode(status: u16) -> Self {
        Self {
            kind: ServiceErrorKind::Decode,
            status: Some(status),
            message: "Lookup service sent an unexpected response".to_string(),
        }
    }

    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Config,
            status: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ServiceErrorKind {
        self.kind
    }

    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

fn truncate_detail(detail: &str) -> String {
    if detail.chars().count() <= MAX_DETAIL_CHARS {
        return detail.to_string();
    }
    let head: String = detail.chars().take(MAX_DETAIL_CHARS - 3).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::{SERVICE_UNREACHABLE, ServiceError, ServiceErrorKind, ValidationError};
    use crate::SessionId;

    #[test]
    fn http_error_uses_detail() {
        let err = ServiceError::http(500, Some("rate limited"));
        assert_eq!(err.to_string(), "rate limited");
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.kind(), ServiceErrorKind::Http);
    }

    #[test]
    fn http_error_without_detail_is_generic() {
        assert_eq!(ServiceError::http(502, None).message(), SERVICE_UNREACHABLE);
        assert_eq!(
            ServiceError::http(502, Some("   ")).message(),
            SERVICE_UNREACHABLE
        );
    }

    #[test]
    fn long_detail_is_truncated() {
        let detail = "x".repeat(1000);
        let err = ServiceError::http(400, Some(&detail));
        assert_eq!(err.message().chars().count(), 300);
        assert!(err.message().ends_with("..."));
    }

    #[test]
    fn transport_error_is_generic() {
        let err = ServiceError::transport();
        assert_eq!(err.message(), SERVICE_UNREACHABLE);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn stale_session_names_the_id() {
        let err = ValidationError::StaleSession(SessionId::new("old").unwrap());
        assert_eq!(err.to_string(), "session old is not the active session");
    }
}
