//! Room engine error types.
//!
//! Validation errors are surfaced to the caller and never retried
//! automatically. `StoreUnavailable` is the only retryable error: every
//! mutating operation except room deletion is idempotent, so callers may
//! resubmit after a transient store failure. Deletion must be re-checked
//! against current room state before any retry.

use thiserror::Error;

use crate::store::StoreError;

/// Room engine error type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The room record does not exist.
    #[error("room not found")]
    RoomNotFound,

    /// Room creation parameters failed validation, or a vote named an item
    /// that is not on the room's ballot.
    #[error("invalid room: {0}")]
    InvalidRoom(String),

    /// The participant is not currently a member of the room.
    #[error("not a member of the room")]
    NotAMember,

    /// The requester is not permitted to perform the operation.
    #[error("not authorized")]
    NotAuthorized,

    /// The storage collaborator failed transiently.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Internal error (actor channel failures and the like).
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Whether the caller may safely retry the failed operation.
    ///
    /// Only transient store failures are retryable, and only for the
    /// idempotent operations (join, leave, vote, presence renewal). Callers
    /// retrying a delete must first re-check room existence.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::StoreUnavailable(_))
    }

    /// A client-safe message that never leaks internal details.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            EngineError::RoomNotFound => "Room not found".to_string(),
            EngineError::InvalidRoom(reason) => reason.clone(),
            EngineError::NotAMember => "You are not a member of this room".to_string(),
            EngineError::NotAuthorized => "Only the room owner can do that".to_string(),
            EngineError::StoreUnavailable(_) => {
                "Temporarily unavailable, please try again".to_string()
            }
            EngineError::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(detail) => EngineError::StoreUnavailable(detail),
        }
    }
}
