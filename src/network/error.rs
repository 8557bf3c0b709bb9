//! API error taxonomy and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::network::attestation::AttestationError;
use crate::network::auth::AuthError;
use crate::network::protocol::ErrorBody;
use crate::network::session::SessionError;
use crate::store::StoreError;

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed request field.
    #[error("{0}")]
    Validation(String),

    /// Credential missing, malformed, expired or forged.
    #[error("invalid session")]
    Auth(#[source] AuthError),

    /// Attestation digest does not match the score and token.
    #[error("score signature mismatch")]
    SignatureMismatch,

    /// Score beyond the plausibility bound.
    #[error("implausible score")]
    ImplausibleScore {
        /// Submitted score.
        score: u64,
        /// Bound for the session.
        max_allowed: u64,
    },

    /// Unknown player.
    #[error("{0}")]
    NotFound(String),

    /// Store unavailable or an atomic operation failed.
    #[error("{context}")]
    Persistence {
        /// What the request was doing.
        context: &'static str,
        /// Store failure.
        #[source]
        source: StoreError,
    },

    /// Server misconfiguration or other internal failure.
    #[error("internal error")]
    Internal(String),
}

impl ApiError {
    /// Wrap a store error with request context.
    pub fn persistence(context: &'static str, source: StoreError) -> Self {
        ApiError::Persistence { context, source }
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::SignatureMismatch => StatusCode::FORBIDDEN,
            ApiError::ImplausibleScore { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Persistence { .. } | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Response body for this error.
    pub fn body(&self) -> ErrorBody {
        let details = match self {
            ApiError::Auth(e) => Some(e.to_string()),
            ApiError::ImplausibleScore { score, max_allowed } => {
                Some(format!("score {} exceeds maximum {}", score, max_allowed))
            }
            ApiError::Persistence { source, .. } => Some(source.to_string()),
            _ => None,
        };
        ErrorBody { error: self.to_string(), details }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Persistence(e) => {
                ApiError::persistence("Failed to start play session", e)
            }
            SessionError::Credential(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<AttestationError> for ApiError {
    fn from(err: AttestationError) -> Self {
        match err {
            AttestationError::MissingCredential(e) | AttestationError::InvalidSession(e) => {
                ApiError::Auth(e)
            }
            AttestationError::SignatureMismatch => ApiError::SignatureMismatch,
            AttestationError::ImplausibleScore { score, max_allowed, .. } => {
                ApiError::ImplausibleScore { score, max_allowed }
            }
            AttestationError::Persistence(e) => ApiError::persistence("Failed to submit score", e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {:?}", self);
        }
        (status, Json(self.body())).into_response()
    }
}
