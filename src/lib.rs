//! Remote function calls over plain HTTP.
//!
//! A server registers named async functions; clients post a multipart body
//! whose parts are the arguments and get the typed result back.

pub mod client;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod middleware;
pub mod multipart;
pub mod net;
pub mod observability;
pub mod routing;
pub mod rpc;
pub mod wire;

pub use client::{ClientError, RemoteClient};
pub use config::ServerConfig;
pub use http::{HttpServer, Request, Response};
pub use lifecycle::Shutdown;
pub use routing::{Handler, Mux};
pub use rpc::{Call, RemoteFunctionTable, RemoteFunctions, RpcError};
pub use wire::{Blob, Value};
