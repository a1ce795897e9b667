//! Calling remote functions from Rust.
//!
//! # Data Flow
//! ```text
//! RemoteClient::call(name, args)
//!     → wire::encode_call (multipart body + type manifest)
//!     → POST endpoint with x-func-name
//!     → status >= 400 → ClientError::Remote
//!     → 204 → Value::Undefined
//!     → wire::decode_result (Type header + body) → Value
//! ```

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use thiserror::Error;

use crate::wire::{
    decode_result, encode_call, Value, WireError, FUNC_NAME_HEADER, PARAM_TYPES_HEADER, TYPE_HEADER,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("remote call failed with {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

/// Client for one remote-call endpoint.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    endpoint: String,
    headers: HeaderMap,
}

impl RemoteClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            headers: HeaderMap::new(),
        }
    }

    /// Send `name: value` with every call.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, ClientError> {
        let header_name =
            HeaderName::try_from(name).map_err(|_| ClientError::InvalidHeader(name.to_string()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| ClientError::InvalidHeader(name.to_string()))?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Call `function` with `args` and decode its result.
    pub async fn call(&self, function: &str, args: &[Value]) -> Result<Value, ClientError> {
        let function_header = HeaderValue::from_str(function)
            .map_err(|_| ClientError::InvalidHeader(FUNC_NAME_HEADER.to_string()))?;
        let encoded = encode_call(args)?;
        let manifest_header = HeaderValue::from_str(&encoded.manifest.to_header())
            .map_err(|_| ClientError::InvalidHeader(PARAM_TYPES_HEADER.to_string()))?;
        let content_type = HeaderValue::from_str(&encoded.content_type())
            .map_err(|_| ClientError::InvalidHeader(CONTENT_TYPE.to_string()))?;

        let response = self
            .http
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .header(FUNC_NAME_HEADER, function_header)
            .header(PARAM_TYPES_HEADER, manifest_header)
            .header(CONTENT_TYPE, content_type)
            .body(encoded.body)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(function, status = status.as_u16(), "Remote call failed");
            return Err(ClientError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Undefined);
        }

        let kind = response
            .headers()
            .get(TYPE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;
        Ok(decode_result(kind.as_deref(), body)?)
    }
}
