//! Wire protocol shared by server and client.
//!
//! # Data Flow
//! ```text
//! client: Vec<Value> → encode.rs → multipart body + x-func-param-datatypes
//! server: Part + TypeTag → (rpc::reconstruct) → Value
//!         Value → result.rs → Type header + body
//! client: Type header + body → result.rs → Value
//! ```
//!
//! # Design Decisions
//! - `Value` is a closed sum type; every variant has exactly one wire form
//! - Containers JSON cannot express use the tagged form in `tagged.rs`
//! - Binary values never nest inside JSON; they travel as their own part

pub mod encode;
pub mod manifest;
pub mod result;
pub mod tagged;
pub mod value;

use thiserror::Error;

pub use encode::{encode_call, EncodedCall};
pub use manifest::{TypeManifest, TypeTag};
pub use result::{decode_result, encode_result, EncodedResult, ResultType};
pub use tagged::{from_json, to_json};
pub use value::{Blob, Value};

/// Header naming the function to call.
pub const FUNC_NAME_HEADER: &str = "x-func-name";
/// Header carrying the type manifest.
pub const PARAM_TYPES_HEADER: &str = "x-func-param-datatypes";
/// Response header carrying the result type.
pub const TYPE_HEADER: &str = "type";
/// Reserved filename marking a JSON-encoded argument.
pub const JSON_FILENAME: &str = ".json";

#[derive(Debug, Error)]
pub enum WireError {
    #[error("binary values cannot be nested inside JSON")]
    NestedBinary,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid number: {0:?}")]
    InvalidNumber(String),

    #[error("malformed type manifest: {0}")]
    InvalidManifest(String),
}
