use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by a [`crate::storage::CredentialStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user '{user}' already has an enrolled gesture")]
    AlreadyExists { user: String },

    #[error("invalid username '{user}': {reason}")]
    InvalidUsername { user: String, reason: &'static str },

    #[error("failed to access credential store at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("credential record {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a failed enrollment or verification attempt.
///
/// None of these are fatal: each maps to something the user can do next.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthError {
    #[error("no hand detected in capture")]
    NoHandDetected,

    #[error("username must not be empty")]
    EmptyUsername,

    #[error("user '{0}' already exists")]
    AlreadyExists(String),

    #[error("no enrolled gesture for user '{0}'")]
    UserNotFound(String),

    #[error("gesture does not match the enrolled credential (similarity {similarity:.3})")]
    CredentialMismatch { similarity: f64 },

    #[error("invalid username '{user}': {reason}")]
    InvalidUsername { user: String, reason: String },

    #[error("credential store unavailable: {0}")]
    StoreUnavailable(String),
}

impl AuthError {
    /// What to ask of the user before trying again.
    pub fn hint(&self) -> &'static str {
        match self {
            AuthError::NoHandDetected => "show one hand clearly and capture again",
            AuthError::EmptyUsername => "enter a username",
            AuthError::AlreadyExists(_) => "choose a different username",
            AuthError::UserNotFound(_) => "check the username spelling",
            AuthError::CredentialMismatch { .. } => "repeat the gesture and capture again",
            AuthError::InvalidUsername { .. } => "use a username without path separators",
            AuthError::StoreUnavailable(_) => "try again later",
        }
    }

    /// Whether a fresh capture alone might change the outcome.
    pub fn wants_recapture(&self) -> bool {
        matches!(
            self,
            AuthError::NoHandDetected | AuthError::CredentialMismatch { .. }
        )
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists { user } => AuthError::AlreadyExists(user),
            StoreError::InvalidUsername { user, reason } => AuthError::InvalidUsername {
                user,
                reason: reason.to_string(),
            },
            other => AuthError::StoreUnavailable(other.to_string()),
        }
    }
}
