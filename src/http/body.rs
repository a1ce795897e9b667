//! Request body as an asynchronous sequence of byte chunks.
//!
//! # Responsibilities
//! - Adapt any chunk stream (hyper body, test vectors) to one pull interface
//! - Signal end-of-stream and transport errors distinctly
//! - Guard each wait for the next chunk with an optional idle timeout
//!
//! # Design Decisions
//! - The reader never buffers ahead; flow control stays with the transport
//! - A closed or broken connection surfaces as `BodyError`, never a hang

use std::time::Duration;

use axum::body::{Body, Bytes};
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use thiserror::Error;
use tower::BoxError;

/// Errors raised while pulling body chunks.
#[derive(Debug, Error)]
pub enum BodyError {
    /// The underlying connection failed mid-stream.
    #[error("body stream aborted: {0}")]
    Transport(String),

    /// No chunk arrived within the idle window.
    #[error("no body data received for {0:?}")]
    IdleTimeout(Duration),

    /// The body was already taken by an earlier reader.
    #[error("request body already consumed")]
    Consumed,
}

/// A one-shot stream of body chunks.
pub struct BodyStream {
    inner: BoxStream<'static, Result<Bytes, BoxError>>,
    idle_timeout: Option<Duration>,
}

impl BodyStream {
    /// Wrap an arbitrary chunk stream.
    pub fn new<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Self {
            inner: stream.map(|chunk| chunk.map_err(Into::into)).boxed(),
            idle_timeout: None,
        }
    }

    /// Adapt an incoming HTTP body.
    pub fn from_body(body: Body) -> Self {
        Self::new(body.into_data_stream())
    }

    /// A body delivered as the given chunks, in order.
    pub fn from_chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let chunks: Vec<Result<Bytes, BoxError>> =
            chunks.into_iter().map(|c| Ok(c.into())).collect();
        Self::new(stream::iter(chunks))
    }

    /// An empty body.
    pub fn empty() -> Self {
        Self::from_chunks(Vec::<Bytes>::new())
    }

    /// Fail a pending read once no chunk has arrived for `timeout`.
    /// A zero duration disables the guard.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Pull the next chunk; `Ok(None)` marks the natural end of the body.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, BodyError> {
        let next = match self.idle_timeout {
            Some(idle) => tokio::time::timeout(idle, self.inner.next())
                .await
                .map_err(|_| BodyError::IdleTimeout(idle))?,
            None => self.inner.next().await,
        };

        match next {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(BodyError::Transport(e.to_string())),
            None => Ok(None),
        }
    }

    /// Drain the stream into one buffer, failing once `limit` bytes are
    /// exceeded (0 = unlimited).
    pub async fn collect(mut self, limit: usize) -> Result<Bytes, CollectError> {
        let mut out = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            if limit > 0 && out.len() + chunk.len() > limit {
                return Err(CollectError::TooLarge(limit));
            }
            out.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(out))
    }
}

impl std::fmt::Debug for BodyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyStream")
            .field("idle_timeout", &self.idle_timeout)
            .finish_non_exhaustive()
    }
}

/// Errors from buffering a whole body.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error(transparent)]
    Body(#[from] BodyError),

    #[error("body exceeds {0} bytes")]
    TooLarge(usize),
}
