//! Result encoding and its client-side inverse.
//!
//! The `Type` response header tells the caller how to coerce the body back:
//!
//! | value              | Type      | Content-Type               |
//! |--------------------|-----------|----------------------------|
//! | string             | `text`    | `plain/text`               |
//! | number             | `number`  | `plain/text`               |
//! | boolean            | `boolean` | `plain/text`               |
//! | null / containers  | `object`  | `application/json`         |
//! | binary             | `blob`    | `application/octet-stream` |
//! | undefined          | none      | none (204)                 |

use axum::body::Bytes;

use crate::wire::tagged::{from_json, to_json};
use crate::wire::value::{format_number, parse_number, Blob, Value};
use crate::wire::WireError;

pub const CONTENT_TYPE_JSON: &str = "application/json";
/// Kept byte-for-byte for existing clients.
pub const CONTENT_TYPE_TEXT: &str = "plain/text";
pub const CONTENT_TYPE_BINARY: &str = "application/octet-stream";

/// Coercion hint carried in the `Type` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultType {
    Text,
    Number,
    Boolean,
    Object,
    Blob,
}

impl ResultType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResultType::Text => "text",
            ResultType::Number => "number",
            ResultType::Boolean => "boolean",
            ResultType::Object => "object",
            ResultType::Blob => "blob",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(ResultType::Text),
            "number" => Some(ResultType::Number),
            "boolean" => Some(ResultType::Boolean),
            "object" => Some(ResultType::Object),
            "blob" => Some(ResultType::Blob),
            _ => None,
        }
    }
}

/// A serialized result. `kind == None` means no content.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedResult {
    pub kind: Option<ResultType>,
    pub content_type: Option<&'static str>,
    pub body: Bytes,
}

pub fn encode_result(value: &Value) -> Result<EncodedResult, WireError> {
    let text = |kind, body: String| EncodedResult {
        kind: Some(kind),
        content_type: Some(CONTENT_TYPE_TEXT),
        body: Bytes::from(body),
    };

    Ok(match value {
        Value::Undefined => EncodedResult {
            kind: None,
            content_type: None,
            body: Bytes::new(),
        },
        Value::String(s) => text(ResultType::Text, s.clone()),
        Value::Number(n) => text(ResultType::Number, format_number(*n)),
        Value::Bool(b) => text(ResultType::Boolean, b.to_string()),
        Value::Bytes(blob) => EncodedResult {
            kind: Some(ResultType::Blob),
            content_type: Some(CONTENT_TYPE_BINARY),
            body: blob.data.clone(),
        },
        other => EncodedResult {
            kind: Some(ResultType::Object),
            content_type: Some(CONTENT_TYPE_JSON),
            body: Bytes::from(serde_json::to_vec(&to_json(other)?)?),
        },
    })
}

/// Invert `encode_result` from the `Type` header and body. A missing or
/// unrecognized type yields the body as text.
pub fn decode_result(kind: Option<&str>, body: Bytes) -> Result<Value, WireError> {
    match kind.and_then(ResultType::parse) {
        Some(ResultType::Number) => {
            let text = String::from_utf8_lossy(&body);
            parse_number(&text)
                .map(Value::Number)
                .ok_or_else(|| WireError::InvalidNumber(text.into_owned()))
        }
        Some(ResultType::Boolean) => Ok(Value::Bool(body.as_ref() == b"true")),
        Some(ResultType::Object) => Ok(from_json(serde_json::from_slice(&body)?)),
        Some(ResultType::Blob) => Ok(Value::Bytes(
            Blob::new("blob", body).with_content_type(CONTENT_TYPE_BINARY),
        )),
        Some(ResultType::Text) | None => Ok(Value::String(String::from_utf8_lossy(&body).into_owned())),
    }
}
