//! Remote function calls over HTTP.
//!
//! # Data Flow
//! ```text
//! POST + x-func-name
//!     → dispatch.rs (resolve name in registry.rs, else 404)
//!     → Request::form_data (multipart decoder, size limits)
//!     → reconstruct.rs (parts + x-func-param-datatypes → Vec<Value>)
//!     → CallEnvelope → RemoteFunction::invoke
//!     → wire::result (Type header + body), or error.rs status + message
//! ```
//!
//! # Design Decisions
//! - The table is immutable after startup and shared without locks
//! - Each request owns its envelope; nothing is shared between calls
//! - Every failure maps to a status for that request only

pub mod dispatch;
pub mod error;
pub mod reconstruct;
pub mod registry;

use crate::wire::Value;

pub use dispatch::{decode_envelope, RemoteFunctions};
pub use error::RpcError;
pub use reconstruct::reconstruct;
pub use registry::{Call, FnFunction, RemoteFunction, RemoteFunctionTable};

/// A decoded call, ready to invoke.
#[derive(Debug, Clone, PartialEq)]
pub struct CallEnvelope {
    pub function_name: String,
    pub args: Vec<Value>,
}
