//! Failure classes of a single remote call.

use axum::http::StatusCode;
use thiserror::Error;

use crate::http::body::{BodyError, CollectError};
use crate::http::request::{FormError, ReadError};
use crate::multipart::MultipartError;
use crate::wire::WireError;

/// Every failure is scoped to one request; none stop the server.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Wrong content type, missing boundary, bad manifest or argument.
    #[error("{0}")]
    Protocol(String),

    #[error("Function \"{0}\" not found")]
    NotFound(String),

    /// Request or field size ceiling breached.
    #[error("{0}")]
    LimitExceeded(String),

    /// The function itself failed or panicked.
    #[error("{0}")]
    Invocation(String),

    /// The body stream broke or went idle.
    #[error(transparent)]
    Transport(BodyError),
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::Protocol(_) => StatusCode::BAD_REQUEST,
            RpcError::NotFound(_) => StatusCode::NOT_FOUND,
            RpcError::LimitExceeded(_) => StatusCode::PAYLOAD_TOO_LARGE,
            RpcError::Invocation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RpcError::Transport(BodyError::IdleTimeout(_)) => StatusCode::REQUEST_TIMEOUT,
            RpcError::Transport(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RpcError::Protocol(_) => "protocol",
            RpcError::NotFound(_) => "not_found",
            RpcError::LimitExceeded(_) => "limit_exceeded",
            RpcError::Invocation(_) => "invocation",
            RpcError::Transport(_) => "transport",
        }
    }
}

impl From<MultipartError> for RpcError {
    fn from(e: MultipartError) -> Self {
        match e {
            MultipartError::Body(body) => RpcError::Transport(body),
            limit => RpcError::LimitExceeded(limit.to_string()),
        }
    }
}

impl From<FormError> for RpcError {
    fn from(e: FormError) -> Self {
        match e {
            FormError::Multipart(inner) => inner.into(),
            other => RpcError::Protocol(other.to_string()),
        }
    }
}

impl From<ReadError> for RpcError {
    fn from(e: ReadError) -> Self {
        match e {
            ReadError::Collect(CollectError::Body(body)) => RpcError::Transport(body),
            ReadError::Collect(too_large @ CollectError::TooLarge(_)) => {
                RpcError::LimitExceeded(format!("maximum request size exceeded: {too_large}"))
            }
            ReadError::Json(json) => RpcError::Protocol(json.to_string()),
        }
    }
}

impl From<WireError> for RpcError {
    fn from(e: WireError) -> Self {
        RpcError::Protocol(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        assert_eq!(RpcError::Protocol("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(RpcError::NotFound("f".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            RpcError::from(MultipartError::RequestTooLarge { limit: 1 }).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            RpcError::from(MultipartError::FieldTooLarge { name: "0".into(), limit: 1 }).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            RpcError::Transport(BodyError::IdleTimeout(Duration::from_secs(1))).status(),
            StatusCode::REQUEST_TIMEOUT
        );
        assert_eq!(
            RpcError::from(FormError::MissingBoundary).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            RpcError::NotFound("does_not_exist".into()).to_string(),
            "Function \"does_not_exist\" not found"
        );
        assert_eq!(
            RpcError::from(FormError::NotMultipart).to_string(),
            "Content-type must be \"multipart/form-data\""
        );
    }
}
