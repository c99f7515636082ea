//! Transport-neutral contract for one remote chat session.
//!
//! This crate intentionally defines only the shared value types and the
//! three-operation transport trait the session engine consumes. It excludes
//! wire payloads, HTTP details, and engine lifecycle concerns.

use std::fmt;

use thiserror::Error;

/// Opaque handle identifying a conversation on the remote service.
///
/// Validity is defined only by whether [`SessionTransport::fetch_history`]
/// succeeds for it; callers may pre-filter candidate values but the engine
/// does not inspect the format.
pub type SessionId = String;

/// Author of one transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Assistant => f.write_str("assistant"),
        }
    }
}

/// One exchange unit in a transcript. Immutable once appended; append order
/// is the sole ordering signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    /// Constructs a user turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Constructs an assistant turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Result of creating a session: the server-issued identity plus the first
/// assistant reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSession {
    pub identity: SessionId,
    pub reply: Turn,
}

/// Normalized failure for any transport operation.
///
/// Carries a machine-readable HTTP-level status when one was observed and an
/// optional server-supplied human-readable detail. `Display` prefers the
/// detail and falls back to a generic transport message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}", self.message())]
pub struct TransportError {
    status: Option<u16>,
    detail: Option<String>,
}

impl TransportError {
    /// Failure with an HTTP status and optional server-supplied detail.
    #[must_use]
    pub fn status(status: u16, detail: Option<String>) -> Self {
        Self {
            status: Some(status),
            detail: sanitize_detail(detail),
        }
    }

    /// Failure below the HTTP layer (connect error, malformed response).
    #[must_use]
    pub fn network(detail: impl Into<String>) -> Self {
        Self {
            status: None,
            detail: sanitize_detail(Some(detail.into())),
        }
    }

    /// Returns the HTTP status code, when one was observed.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        self.status
    }

    /// Returns the server-supplied detail, when present.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// True when the failure is a detectable not-found response.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }

    fn message(&self) -> String {
        match (&self.detail, self.status) {
            (Some(detail), _) => detail.clone(),
            (None, Some(status)) => format!("chat service request failed (HTTP {status})"),
            (None, None) => "chat service request failed".to_string(),
        }
    }
}

fn sanitize_detail(detail: Option<String>) -> Option<String> {
    detail.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Transport interface for one remote chat session.
///
/// Each operation is a single logical request/response exchange. No retries
/// happen at this seam; retry policy belongs to the caller.
pub trait SessionTransport: Send + Sync + 'static {
    /// Creates a session seeded with the first user message.
    fn create_session(&self, first_message: &str) -> Result<CreatedSession, TransportError>;

    /// Fetches the authoritative history for an identity. Unknown identities
    /// fail with a not-found error where the server makes that detectable.
    fn fetch_history(&self, identity: &str) -> Result<Vec<Turn>, TransportError>;

    /// Sends one user turn and returns the assistant reply.
    fn send_turn(&self, identity: &str, content: &str) -> Result<Turn, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::{CreatedSession, Role, SessionTransport, TransportError, Turn};

    struct EmptyTransport;

    impl SessionTransport for EmptyTransport {
        fn create_session(&self, first_message: &str) -> Result<CreatedSession, TransportError> {
            Ok(CreatedSession {
                identity: "000000".to_string(),
                reply: Turn::assistant(format!("echo: {first_message}")),
            })
        }

        fn fetch_history(&self, _identity: &str) -> Result<Vec<Turn>, TransportError> {
            Ok(Vec::new())
        }

        fn send_turn(&self, _identity: &str, content: &str) -> Result<Turn, TransportError> {
            Ok(Turn::assistant(format!("echo: {content}")))
        }
    }

    #[test]
    fn turn_constructors_tag_roles() {
        assert_eq!(Turn::user("hi").role, Role::User);
        assert_eq!(Turn::assistant("hello").role, Role::Assistant);
        assert_eq!(Turn::user("hi").content, "hi");
    }

    #[test]
    fn transport_error_display_prefers_server_detail() {
        let error = TransportError::status(502, Some("upstream model unavailable".to_string()));
        assert_eq!(error.to_string(), "upstream model unavailable");
        assert_eq!(error.status_code(), Some(502));
    }

    #[test]
    fn transport_error_without_detail_falls_back_to_generic_message() {
        assert_eq!(
            TransportError::status(500, None).to_string(),
            "chat service request failed (HTTP 500)"
        );
        assert_eq!(
            TransportError::status(500, Some("   ".to_string())).to_string(),
            "chat service request failed (HTTP 500)"
        );
    }

    #[test]
    fn network_error_without_status_uses_plain_fallback() {
        let error = TransportError {
            status: None,
            detail: None,
        };
        assert_eq!(error.to_string(), "chat service request failed");
        assert!(error.status_code().is_none());
    }

    #[test]
    fn not_found_detection_is_status_based() {
        assert!(TransportError::status(404, None).is_not_found());
        assert!(!TransportError::status(500, None).is_not_found());
        assert!(!TransportError::network("connection refused").is_not_found());
    }

    #[test]
    fn transport_trait_is_object_safe() {
        let transport: Box<dyn SessionTransport> = Box::new(EmptyTransport);
        let created = transport
            .create_session("hello")
            .expect("create should succeed");

        assert_eq!(created.identity, "000000");
        assert_eq!(created.reply.role, Role::Assistant);
        assert!(transport
            .fetch_history(&created.identity)
            .expect("history should succeed")
            .is_empty());
    }
}
