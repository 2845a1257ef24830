//! Crate-level error taxonomy and HTTP mapping.
//!
//! Every stage of the pipeline fails fast and returns the first error
//! encountered; no stage catches and downgrades an earlier stage's error.
//! This module maps the taxonomy onto HTTP status codes and structured JSON
//! error payloads for whatever routing layer embeds the pipeline.
//!
//! Responses never leak which authentication check failed, secret material,
//! signature values, or internal state: authentication failures collapse to
//! one generic category and message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::component::RequestError;
use crate::signature::SignatureError;
use crate::store::StoreError;
use crate::upstream::UpstreamError;

/// Failures surfaced by the deployment pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeployError {
    /// Missing/unconfigured secret or missing/invalid signature. The inner
    /// reason is kept for logging; the public surface never distinguishes.
    #[error("authentication failed: {0}")]
    Authentication(SignatureError),

    /// The body exceeds the configured size ceiling. Checked before any
    /// cryptographic work.
    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge {
        /// Received body size in bytes.
        size: usize,
        /// Configured ceiling in bytes.
        limit: usize,
    },

    /// Malformed body shape or missing required fields.
    #[error(transparent)]
    Validation(#[from] RequestError),

    /// Unknown component id or slug.
    #[error("component not found")]
    NotFound,

    /// Opaque failure from the persistence collaborator, propagated
    /// verbatim and never swallowed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Failure from the AI provider collaborator. Single attempt; not
    /// retried by this pipeline.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl From<SignatureError> for DeployError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::PayloadTooLarge { size, limit } => {
                Self::PayloadTooLarge { size, limit }
            }
            other => Self::Authentication(other),
        }
    }
}

impl DeployError {
    /// Returns the HTTP status code for this error.
    ///
    /// - Authentication (any reason): 403 Forbidden
    /// - Payload too large: 413 Content Too Large
    /// - Validation: 400 Bad Request
    /// - Not found: 404 Not Found
    /// - Store failure: 502 Bad Gateway (the collaborator's own status,
    ///   where it has one, belongs to the embedding layer)
    /// - Upstream provider failure: 502 Bad Gateway
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Authentication(_) => StatusCode::FORBIDDEN,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Stable machine-readable category for error payloads.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "authentication_error",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::Validation(_) => "validation_error",
            Self::NotFound => "not_found",
            Self::Store(_) => "store_error",
            Self::Upstream(_) => "upstream_provider_error",
        }
    }

    /// Human-readable message safe to return to the caller.
    ///
    /// Authentication failures share one message regardless of which check
    /// failed.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Authentication(_) => "Deployment request could not be authenticated.".into(),
            Self::PayloadTooLarge { .. } => "Payload exceeds size limit.".into(),
            Self::Validation(err) => err.to_string(),
            Self::NotFound => "Component not found.".into(),
            Self::Store(_) => "Component store rejected the operation.".into(),
            Self::Upstream(_) => "Upstream provider returned no usable component.".into(),
        }
    }
}

impl IntoResponse for DeployError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.category(),
            "message": self.public_message(),
        });
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_the_taxonomy() {
        assert_eq!(
            DeployError::Authentication(SignatureError::MissingSecret).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            DeployError::Authentication(SignatureError::InvalidSignature).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            DeployError::PayloadTooLarge {
                size: 1,
                limit: 0
            }
            .status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            DeployError::Validation(RequestError::MissingTitle).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(DeployError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            DeployError::Store(StoreError::Storage("db down".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            DeployError::Upstream(UpstreamError::EmptyResponse).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn signature_errors_split_between_auth_and_size() {
        assert!(matches!(
            DeployError::from(SignatureError::MissingSignature),
            DeployError::Authentication(_)
        ));
        assert!(matches!(
            DeployError::from(SignatureError::PayloadTooLarge { size: 9, limit: 8 }),
            DeployError::PayloadTooLarge { size: 9, limit: 8 }
        ));
    }

    #[test]
    fn authentication_failures_do_not_reveal_which_check_failed() {
        let missing = DeployError::Authentication(SignatureError::MissingSecret);
        let invalid = DeployError::Authentication(SignatureError::InvalidSignature);
        assert_eq!(missing.public_message(), invalid.public_message());
        assert_eq!(missing.status_code(), invalid.status_code());
        assert_eq!(missing.category(), invalid.category());
    }

    #[test]
    fn public_messages_do_not_leak_store_internals() {
        let err = DeployError::Store(StoreError::Storage(
            "connection string postgres://user:pw@host".into(),
        ));
        assert!(!err.public_message().contains("postgres"));
    }
}
