//! Error types for skillforge-core operations.
//!
//! Two families: `ForgeError` for local failures (storage, configuration) and
//! `ServiceError` for failures reported by the remote collaborators. Service
//! failures are always recovered by the controller; they never end a session
//! loop.

use std::path::PathBuf;

// ═══════════════════════════════════════════════════════════════════════════════
// Local Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// All errors that can occur in skillforge-core local operations.
#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Storage Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Storage file malformed: {path}: {details}")]
    StorageMalformed { path: PathBuf, details: String },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ForgeError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ForgeError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        ForgeError::Json {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using ForgeError.
pub type Result<T> = std::result::Result<T, ForgeError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Collaborator Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Failures reported by the identity and conversation services.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Token rejected (missing, invalid or expired).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The request never produced a response (connect failure, timeout).
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The response arrived but could not be decoded.
    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Unexpected status {status}: {message}")]
    Status { status: u16, message: String },
}

impl ServiceError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ServiceError::Unauthorized(_))
    }

    /// Short machine-readable tag for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::Transport(_) => "transport",
            ServiceError::Malformed(_) => "malformed",
            ServiceError::Status { .. } => "status",
        }
    }
}

impl From<skillforge_protocol::PayloadError> for ServiceError {
    fn from(err: skillforge_protocol::PayloadError) -> Self {
        ServiceError::Malformed(err.to_string())
    }
}

// Conversion for string error compatibility
impl From<ForgeError> for String {
    fn from(err: ForgeError) -> String {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_is_detected() {
        assert!(ServiceError::Unauthorized("expired".to_string()).is_unauthorized());
        assert!(!ServiceError::Transport("refused".to_string()).is_unauthorized());
    }

    #[test]
    fn payload_errors_become_malformed() {
        let err: ServiceError =
            skillforge_protocol::PayloadError::new("invalid_payload", "not a list").into();
        assert_eq!(err.kind(), "malformed");
        assert!(err.to_string().contains("not a list"));
    }
}
