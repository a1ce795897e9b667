//! Client-side call encoding.
//!
//! One multipart part per argument, named by position:
//!
//! - containers → file part `.json` holding tagged JSON
//! - binary → file part carrying its own filename (`blob` if anonymous)
//! - scalars → plain field holding the value's string form
//!
//! The type manifest lists a tag for every non-binary argument.

use axum::body::Bytes;

use crate::wire::manifest::{TypeManifest, TypeTag};
use crate::wire::tagged::to_json;
use crate::wire::value::{format_number, Value};
use crate::wire::{WireError, JSON_FILENAME};

const BOUNDARY_PREFIX: &str = "----RpcMuxBoundary";
const BOUNDARY_RANDOM_LEN: usize = 24;

/// A fully encoded call body plus the headers that must accompany it.
#[derive(Debug, Clone)]
pub struct EncodedCall {
    pub boundary: String,
    pub manifest: TypeManifest,
    pub body: Bytes,
}

impl EncodedCall {
    /// `Content-Type` header value.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}

struct EncodedPart {
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

/// Encode `args` with a fresh random boundary.
pub fn encode_call(args: &[Value]) -> Result<EncodedCall, WireError> {
    let (parts, manifest) = encode_parts(args)?;

    // regenerate in the unlikely case the boundary occurs inside a part
    let boundary = loop {
        let candidate = random_boundary();
        let delimiter = format!("--{candidate}");
        let collides = parts.iter().any(|p| {
            p.data
                .windows(delimiter.len())
                .any(|window| window == delimiter.as_bytes())
        });
        if !collides {
            break candidate;
        }
    };

    Ok(EncodedCall {
        body: assemble(&parts, &boundary),
        boundary,
        manifest,
    })
}

/// Encode `args` with a caller-chosen boundary. The caller guarantees the
/// boundary does not occur in any argument.
pub fn encode_call_with_boundary(args: &[Value], boundary: &str) -> Result<EncodedCall, WireError> {
    let (parts, manifest) = encode_parts(args)?;
    Ok(EncodedCall {
        body: assemble(&parts, boundary),
        boundary: boundary.to_string(),
        manifest,
    })
}

fn encode_parts(args: &[Value]) -> Result<(Vec<EncodedPart>, TypeManifest), WireError> {
    let mut parts = Vec::with_capacity(args.len());
    let mut tags = Vec::with_capacity(args.len());

    for arg in args {
        if let Some(tag) = TypeTag::of(arg) {
            tags.push(tag);
        }
        let part = match arg {
            Value::Bytes(blob) => EncodedPart {
                filename: Some(blob.filename.clone()),
                content_type: Some(
                    blob.content_type
                        .clone()
                        .unwrap_or_else(|| "application/octet-stream".to_string()),
                ),
                data: blob.data.clone(),
            },
            v if v.is_container() => EncodedPart {
                filename: Some(JSON_FILENAME.to_string()),
                content_type: Some("application/json".to_string()),
                data: Bytes::from(serde_json::to_vec(&to_json(v)?)?),
            },
            scalar => EncodedPart {
                filename: None,
                content_type: None,
                data: Bytes::from(scalar_text(scalar)),
            },
        };
        parts.push(part);
    }

    Ok((parts, TypeManifest::new(tags)))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::String(s) => s.clone(),
        // containers and binary never reach here
        _ => String::new(),
    }
}

fn assemble(parts: &[EncodedPart], boundary: &str) -> Bytes {
    let mut body = Vec::new();
    for (index, part) in parts.iter().enumerate() {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{index}\"");
        if let Some(filename) = &part.filename {
            disposition.push_str(&format!("; filename=\"{}\"", quote(filename)));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = &part.content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    Bytes::from(body)
}

/// Escape a header parameter value for a quoted string.
fn quote(value: &str) -> String {
    value
        .chars()
        .flat_map(|c| match c {
            '"' | '\\' => vec!['\\', c],
            '\r' | '\n' => vec![' '],
            _ => vec![c],
        })
        .collect()
}

fn random_boundary() -> String {
    let suffix: String = (0..BOUNDARY_RANDOM_LEN).map(|_| fastrand::alphanumeric()).collect();
    format!("{BOUNDARY_PREFIX}{suffix}")
}
