//! Error types for townhall
//!
//! Every engine operation returns `Result<T>`. The action boundary (HTTP
//! routes, or any other caller) branches on [`CivicError::kind`] and
//! [`CivicError::code`], never on message text.

use hyper::StatusCode;
use serde::Serialize;
use std::fmt;

use crate::auth::DenyReason;

/// Uniqueness violations surfaced as typed outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictKind {
    /// A signature for (petition, user) already exists
    AlreadySigned,
    /// A vote for (poll, user) already exists
    AlreadyVoted,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadySigned => "ALREADY_SIGNED",
            Self::AlreadyVoted => "ALREADY_VOTED",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::AlreadySigned => "You already signed this petition",
            Self::AlreadyVoted => "You have already voted on this poll",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Stable category of an error, independent of its message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Forbidden,
    InvalidInput,
    NotFound,
    Conflict,
    StateError,
    Unauthorized,
    Unavailable,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forbidden => "forbidden",
            Self::InvalidInput => "invalid_input",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::StateError => "state_error",
            Self::Unauthorized => "unauthorized",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal",
        }
    }
}

/// Main error type for townhall operations
#[derive(Debug, thiserror::Error)]
pub enum CivicError {
    #[error("Forbidden: {}", .0.message())]
    Forbidden(DenyReason),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Location is required")]
    LocationRequired,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(ConflictKind),

    /// `reason` is set when the guard refused on lifecycle grounds
    #[error("State error: {message}")]
    State {
        reason: Option<DenyReason>,
        message: String,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CivicError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::InvalidInput(_) | Self::LocationRequired => ErrorKind::InvalidInput,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::State { .. } => ErrorKind::StateError,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Database(_) => ErrorKind::Unavailable,
            Self::Config(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Machine-checkable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::Forbidden(reason) => reason.as_str(),
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::LocationRequired => "LOCATION_REQUIRED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(kind) => kind.as_str(),
            Self::State { reason: Some(reason), .. } => reason.as_str(),
            Self::State { reason: None, .. } => "INVALID_STATE",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Database(_) => "DATABASE_UNAVAILABLE",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict | ErrorKind::StateError => StatusCode::CONFLICT,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to end users.
    ///
    /// Infrastructure failures are collapsed so store internals never reach
    /// a client.
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) => "Storage is temporarily unavailable".to_string(),
            Self::Config(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Forbidden(reason) => reason.message().to_string(),
            Self::Conflict(kind) => kind.message().to_string(),
            Self::InvalidInput(msg)
            | Self::NotFound(msg)
            | Self::State { message: msg, .. }
            | Self::Unauthorized(msg) => msg.clone(),
            Self::LocationRequired => {
                "Location missing. Set a location on your profile or pass ?location=".to_string()
            }
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        Self::State {
            reason: None,
            message: msg.into(),
        }
    }

    pub fn not_found(entity: &str) -> Self {
        Self::NotFound(format!("{entity} not found"))
    }
}

/// Guard denials map onto error kinds in exactly one place, so the same
/// reason always produces the same outcome whichever route asked.
impl From<DenyReason> for CivicError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::NotCitizen
            | DenyReason::NotOfficial
            | DenyReason::NotOwner
            | DenyReason::OwnPetition
            | DenyReason::WrongLocation => Self::Forbidden(reason),
            DenyReason::NotActive | DenyReason::PetitionClosed => Self::State {
                reason: Some(reason),
                message: reason.message().to_string(),
            },
            DenyReason::AlreadySigned => Self::Conflict(ConflictKind::AlreadySigned),
            DenyReason::AlreadyVoted => Self::Conflict(ConflictKind::AlreadyVoted),
        }
    }
}

impl From<std::io::Error> for CivicError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for CivicError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for CivicError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for CivicError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for CivicError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Internal(format!("BSON encoding error: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for CivicError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized(format!("JWT error: {}", err))
    }
}

/// Result type alias for townhall operations
pub type Result<T> = std::result::Result<T, CivicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denials_map_to_distinct_kinds() {
        assert_eq!(CivicError::from(DenyReason::NotCitizen).kind(), ErrorKind::Forbidden);
        assert_eq!(CivicError::from(DenyReason::WrongLocation).kind(), ErrorKind::Forbidden);
        assert_eq!(CivicError::from(DenyReason::NotOwner).kind(), ErrorKind::Forbidden);
        assert_eq!(CivicError::from(DenyReason::NotActive).kind(), ErrorKind::StateError);
        assert_eq!(CivicError::from(DenyReason::PetitionClosed).kind(), ErrorKind::StateError);
        assert_eq!(CivicError::from(DenyReason::AlreadySigned).kind(), ErrorKind::Conflict);
        assert_eq!(CivicError::from(DenyReason::AlreadyVoted).kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_state_denials_keep_their_reason() {
        let closed = CivicError::from(DenyReason::PetitionClosed);
        let inactive = CivicError::from(DenyReason::NotActive);
        assert_eq!(closed.code(), "PETITION_CLOSED");
        assert_eq!(inactive.code(), "NOT_ACTIVE");
        assert_eq!(closed.status_code(), StatusCode::CONFLICT);
        assert_eq!(closed.public_message(), DenyReason::PetitionClosed.message());
        assert_eq!(CivicError::state("bad transition").code(), "INVALID_STATE");
    }

    #[test]
    fn test_conflict_is_not_invalid_input() {
        let conflict = CivicError::Conflict(ConflictKind::AlreadySigned);
        let invalid = CivicError::invalid("title is required");
        assert_ne!(conflict.kind(), invalid.kind());
        assert_ne!(conflict.status_code(), invalid.status_code());
        assert_eq!(conflict.code(), "ALREADY_SIGNED");
        assert_eq!(invalid.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(CivicError::from(DenyReason::NotOfficial).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(CivicError::LocationRequired.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(CivicError::not_found("Poll").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(CivicError::state("closed").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            CivicError::Database("down".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_public_message_hides_internals() {
        let err = CivicError::Database("E11000 at 10.0.0.3:27017".into());
        assert!(!err.public_message().contains("27017"));
        assert_eq!(CivicError::LocationRequired.code(), "LOCATION_REQUIRED");
    }

    #[test]
    fn test_same_reason_same_contract() {
        let a = CivicError::from(DenyReason::WrongLocation);
        let b = CivicError::from(DenyReason::WrongLocation);
        assert_eq!(a.code(), b.code());
        assert_eq!(a.public_message(), b.public_message());
        assert_eq!(a.status_code(), b.status_code());
    }
}
