//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::Listener)
//!     → server.rs (hyper-util auto: HTTP/1.1 + HTTP/2)
//!     → tower-http layers (request ID, trace, timeout)
//!     → request.rs (method, url, headers, body.rs stream)
//!     → routing::Mux (middleware + routes)
//!     → response.rs (status, headers, buffered body)
//!     → Send to client
//! ```

pub mod body;
pub mod request;
pub mod request_id;
pub mod response;
pub mod server;

pub use body::{BodyError, BodyStream};
pub use request::{FormError, ReadError, Request};
pub use request_id::{UuidRequestId, X_REQUEST_ID};
pub use response::{Response, ResponseError};
pub use server::HttpServer;
