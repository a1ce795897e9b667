//! Streaming multipart/form-data decoder.
//!
//! # Data Flow
//! ```text
//! BodyStream (chunks, end, error)
//!     → parser.rs (SEARCH → HEADERS → BODY per part, limits on completion)
//!         → buffer.rs (append, find from offset, compact)
//!         → part.rs (Content-Disposition / Content-Type)
//!     → Vec<Part> in arrival order
//! ```
//!
//! # Design Decisions
//! - Lenient termination: a body that ends without the closing boundary
//!   yields the parts completed so far
//! - Any transport error aborts the parse with that error
//! - Both size ceilings fail the whole parse, never just one part

pub mod buffer;
pub mod parser;
pub mod part;

use thiserror::Error;

use crate::http::body::{BodyError, BodyStream};

pub use parser::MultipartParser;
pub use part::Part;

/// Size ceilings for one form body. Zero means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Limits {
    /// Sum of all part bodies.
    pub max_request_bytes: usize,
    /// Any single part body.
    pub max_field_bytes: usize,
}

/// Errors produced while decoding a multipart body.
#[derive(Debug, Error)]
pub enum MultipartError {
    #[error("maximum request size exceeded ({limit} bytes)")]
    RequestTooLarge { limit: usize },

    #[error("maximum field size exceeded for field \"{name}\" ({limit} bytes)")]
    FieldTooLarge { name: String, limit: usize },

    #[error(transparent)]
    Body(#[from] BodyError),
}

/// Decode a whole multipart body from `body`.
pub async fn parse_multipart(
    mut body: BodyStream,
    boundary: &str,
    limits: Limits,
) -> Result<Vec<Part>, MultipartError> {
    let mut parser = MultipartParser::new(boundary, limits);

    while !parser.is_done() {
        match body.next_chunk().await? {
            Some(chunk) => parser.feed(&chunk)?,
            None => {
                tracing::debug!(
                    parts = parser.parts().len(),
                    "Form body ended without a closing boundary"
                );
                break;
            }
        }
    }

    tracing::trace!(
        parts = parser.parts().len(),
        bytes = parser.total_bytes(),
        "Form body decoded"
    );
    Ok(parser.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use futures_util::stream;
    use tower::BoxError;

    const BODY: &str = "--B\r\nContent-Disposition: form-data; name=\"0\"\r\n\r\nhello\r\n--B--\r\n";

    #[tokio::test]
    async fn test_parse_from_stream() {
        let parts = parse_multipart(BodyStream::from_chunks([&BODY[..7], &BODY[7..]]), "B", Limits::default())
            .await
            .unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].text(), "hello");
    }

    #[tokio::test]
    async fn test_stream_error_aborts() {
        let items: Vec<Result<Bytes, BoxError>> = vec![
            Ok(Bytes::from_static(b"--B\r\nContent-Disposition: form-data; name=\"0\"\r\n\r\nhel")),
            Err("peer closed".into()),
        ];
        let err = parse_multipart(BodyStream::new(stream::iter(items)), "B", Limits::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MultipartError::Body(BodyError::Transport(_))));
    }

    #[tokio::test]
    async fn test_stops_reading_after_close() {
        let items: Vec<Result<Bytes, BoxError>> = vec![
            Ok(Bytes::from_static(BODY.as_bytes())),
            Err("never polled".into()),
        ];
        let parts = parse_multipart(BodyStream::new(stream::iter(items)), "B", Limits::default())
            .await
            .unwrap();
        assert_eq!(parts.len(), 1);
    }
}
