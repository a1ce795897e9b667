//! Incoming request as seen by handlers.
//!
//! # Responsibilities
//! - Expose method, url, path, headers and path parameters
//! - Carry per-request extensions set by middleware (auth context etc.)
//! - Own the one-shot body and decode it as bytes, text, JSON or form data
//!
//! # Design Decisions
//! - The body is taken on first read; a second read fails with `Consumed`
//! - Size limits travel with the request so every reader enforces the same
//!   ceilings

use std::collections::HashMap;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, Extensions, HeaderMap, HeaderName, HeaderValue, Method};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::http::body::{BodyError, BodyStream, CollectError};
use crate::multipart::{parse_multipart, Limits, MultipartError, Part};

/// Errors from reading a non-form body.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<BodyError> for ReadError {
    fn from(e: BodyError) -> Self {
        ReadError::Collect(CollectError::Body(e))
    }
}

/// Errors from reading a multipart form body.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("Content-type must be \"multipart/form-data\"")]
    NotMultipart,

    #[error("Missing boundary")]
    MissingBoundary,

    #[error(transparent)]
    Multipart(#[from] MultipartError),
}

impl From<BodyError> for FormError {
    fn from(e: BodyError) -> Self {
        FormError::Multipart(MultipartError::Body(e))
    }
}

pub struct Request {
    method: Method,
    /// Path plus query, as received.
    url: String,
    headers: HeaderMap,
    path_params: HashMap<String, String>,
    extensions: Extensions,
    limits: Limits,
    body: Option<BodyStream>,
}

impl Request {
    /// A request with no headers and an empty body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            path_params: HashMap::new(),
            extensions: Extensions::new(),
            limits: Limits::default(),
            body: Some(BodyStream::empty()),
        }
    }

    /// Adapt an incoming HTTP request.
    pub fn from_http(request: axum::extract::Request, limits: Limits, body_idle: Duration) -> Self {
        let (parts, body) = request.into_parts();
        let url = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        Self {
            method: parts.method,
            url,
            headers: parts.headers,
            path_params: HashMap::new(),
            extensions: parts.extensions,
            limits,
            body: Some(BodyStream::from_body(body).with_idle_timeout(body_idle)),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Add a header; invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::from_str(value)) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: BodyStream) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The url without its query string.
    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or_default()
    }

    pub fn query(&self) -> Option<&str> {
        self.url.split_once('?').map(|(_, q)| q)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The media type of `Content-Type`, lowercased, without parameters.
    pub fn content_type(&self) -> Option<String> {
        self.header(header::CONTENT_TYPE.as_str())
            .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    pub fn path_params(&self) -> &HashMap<String, String> {
        &self.path_params
    }

    pub(crate) fn set_path_params(&mut self, params: Vec<(String, String)>) {
        self.path_params = params.into_iter().collect();
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Take the body stream for custom reading.
    pub fn take_body(&mut self) -> Result<BodyStream, BodyError> {
        self.body.take().ok_or(BodyError::Consumed)
    }

    /// Buffer the whole body, bounded by `max_request_bytes`.
    pub async fn bytes(&mut self) -> Result<Bytes, ReadError> {
        let body = self.take_body()?;
        Ok(body.collect(self.limits.max_request_bytes).await?)
    }

    /// The body as UTF-8 text, replacing invalid sequences.
    pub async fn text(&mut self) -> Result<String, ReadError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn json<T: DeserializeOwned>(&mut self) -> Result<T, ReadError> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Decode a `multipart/form-data` body into its parts.
    pub async fn form_data(&mut self) -> Result<Vec<Part>, FormError> {
        let content_type = self
            .header(header::CONTENT_TYPE.as_str())
            .ok_or(FormError::NotMultipart)?;
        let boundary = multipart_boundary(content_type)?;
        let body = self.take_body()?;
        Ok(parse_multipart(body, &boundary, self.limits).await?)
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("path_params", &self.path_params)
            .finish_non_exhaustive()
    }
}

/// Extract the boundary from a `multipart/form-data` content type.
pub fn multipart_boundary(content_type: &str) -> Result<String, FormError> {
    let mut params = content_type.split(';');
    let media_type = params.next().unwrap_or_default().trim();
    if !media_type.eq_ignore_ascii_case("multipart/form-data") {
        return Err(FormError::NotMultipart);
    }

    params
        .filter_map(|p| p.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|b| !b.is_empty())
        .ok_or(FormError::MissingBoundary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_extraction() {
        assert_eq!(
            multipart_boundary("multipart/form-data; boundary=abc").unwrap(),
            "abc"
        );
        assert_eq!(
            multipart_boundary("Multipart/Form-Data; charset=utf-8; Boundary=\"a b\"").unwrap(),
            "a b"
        );
        assert!(matches!(
            multipart_boundary("application/json"),
            Err(FormError::NotMultipart)
        ));
        assert!(matches!(
            multipart_boundary("multipart/form-data"),
            Err(FormError::MissingBoundary)
        ));
        assert!(matches!(
            multipart_boundary("multipart/form-data; boundary="),
            Err(FormError::MissingBoundary)
        ));
    }

    #[test]
    fn test_path_and_query() {
        let req = Request::new(Method::GET, "/users/1?x=2");
        assert_eq!(req.path(), "/users/1");
        assert_eq!(req.query(), Some("x=2"));
        assert_eq!(Request::new(Method::GET, "/").query(), None);
    }

    #[tokio::test]
    async fn test_body_is_one_shot() {
        let mut req = Request::new(Method::POST, "/")
            .with_body(BodyStream::from_chunks(["{\"a\":", "1}"]));
        let value: serde_json::Value = req.json().await.unwrap();
        assert_eq!(value["a"], 1);
        assert!(matches!(
            req.text().await,
            Err(ReadError::Collect(CollectError::Body(BodyError::Consumed)))
        ));
    }

    #[tokio::test]
    async fn test_form_data() {
        let body = "--q\r\nContent-Disposition: form-data; name=\"0\"\r\n\r\nv\r\n--q--\r\n";
        let mut req = Request::new(Method::POST, "/")
            .with_header("content-type", "multipart/form-data; boundary=q")
            .with_body(BodyStream::from_chunks([body]));
        let parts = req.form_data().await.unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].text(), "v");
    }

    #[tokio::test]
    async fn test_form_data_requires_multipart() {
        let mut req = Request::new(Method::POST, "/").with_header("content-type", "text/plain");
        assert!(matches!(req.form_data().await, Err(FormError::NotMultipart)));
    }
}
