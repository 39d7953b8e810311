use axum::http::StatusCode;

use super::profiles::ProfileViolation;
use super::store::StoreError;

/// Error raised by the matching operations.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// Caller misuse such as liking yourself or asking for zero candidates.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    InvalidProfile(#[from] ProfileViolation),
    /// The pair is not in a state that permits the operation.
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

impl MatchError {
    /// Store failures are transient; every write in the core is idempotent, so a retry is safe.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MatchError::StoreUnavailable(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            MatchError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            MatchError::InvalidProfile(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MatchError::InvalidState(_) => StatusCode::CONFLICT,
            MatchError::NotFound(_) => StatusCode::NOT_FOUND,
            MatchError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}
