//! The remote-call middleware.
//!
//! # Responsibilities
//! - Claim `POST` requests, resolve `x-func-name` against the table
//! - Decode the body into a `CallEnvelope`
//! - Invoke the function and write the typed result
//!
//! # Design Decisions
//! - Other methods pass through untouched so later handlers can serve them
//! - The function is resolved before the body is read; unknown names never
//!   cost a body parse
//! - The body is fully decoded before invocation, so a limit breach never
//!   leaves a call half-run
//! - Panics inside a function are caught and reported like errors

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::http::{header, Extensions, Method, StatusCode};
use futures_util::FutureExt;

use crate::http::{Request, Response, X_REQUEST_ID};
use crate::observability::metrics;
use crate::routing::Handler;
use crate::rpc::reconstruct::reconstruct;
use crate::rpc::registry::{Call, RemoteFunction, RemoteFunctionTable};
use crate::rpc::{CallEnvelope, RpcError};
use crate::wire::{encode_result, TypeManifest, Value, FUNC_NAME_HEADER, PARAM_TYPES_HEADER, TYPE_HEADER};

const UNKNOWN_FUNCTION_LABEL: &str = "<unknown>";

/// Serves the functions of one `RemoteFunctionTable`.
#[derive(Clone)]
pub struct RemoteFunctions {
    table: Arc<RemoteFunctionTable>,
    shared: Extensions,
}

impl RemoteFunctions {
    pub fn new(table: RemoteFunctionTable) -> Self {
        tracing::info!(functions = ?table.names(), "Remote functions registered");
        Self {
            table: Arc::new(table),
            shared: Extensions::new(),
        }
    }

    /// Hand `value` to every call, e.g. a database handle.
    pub fn with_shared<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.shared.insert(value);
        self
    }

    pub fn table(&self) -> &RemoteFunctionTable {
        &self.table
    }

    /// Registered names label their own series; anything else shares one.
    fn metric_label<'a>(&self, name: &'a str) -> &'a str {
        if self.table.contains(name) {
            name
        } else {
            UNKNOWN_FUNCTION_LABEL
        }
    }

    async fn serve(&self, req: &mut Request, res: &mut Response, name: &str) -> Result<(), RpcError> {
        let function = self
            .table
            .get(name)
            .ok_or_else(|| RpcError::NotFound(name.to_string()))?;

        let envelope = decode_envelope(req, name).await?;
        let mut extensions = std::mem::take(req.extensions_mut());
        extensions.extend(self.shared.clone());

        let value = invoke(function.as_ref(), envelope, extensions).await?;
        let encoded = encode_result(&value).map_err(|e| RpcError::Invocation(e.to_string()))?;

        match encoded.kind {
            None => {
                res.status(StatusCode::NO_CONTENT);
            }
            Some(kind) => {
                res.set_header(TYPE_HEADER, kind.as_str());
                if let Some(content_type) = encoded.content_type {
                    res.set_header(header::CONTENT_TYPE.as_str(), content_type);
                }
            }
        }
        if res.end(&encoded.body).is_err() {
            tracing::warn!(function = %name, "Response already sent by the function's request chain");
        }
        Ok(())
    }
}

#[async_trait]
impl Handler for RemoteFunctions {
    async fn call(&self, req: &mut Request, res: &mut Response) {
        if *req.method() != Method::POST {
            return;
        }

        let start = Instant::now();
        let name = req.header(FUNC_NAME_HEADER).unwrap_or_default().to_string();
        let request_id = req.header(X_REQUEST_ID).unwrap_or("unknown").to_string();

        let status = match self.serve(req, res, &name).await {
            Ok(()) => {
                tracing::debug!(request_id = %request_id, function = %name, "Remote call completed");
                res.status_code()
            }
            Err(e) => {
                let status = e.status();
                if status.is_server_error() {
                    tracing::error!(request_id = %request_id, function = %name, error = %e, "Remote call failed");
                } else {
                    tracing::warn!(request_id = %request_id, function = %name, kind = e.kind(), error = %e, "Remote call rejected");
                }
                res.status(status);
                let _ = res.end(e.to_string());
                status
            }
        };

        metrics::record_call(self.metric_label(&name), status.as_u16(), start);
    }
}

/// Decode the request body into the call's arguments.
pub async fn decode_envelope(req: &mut Request, name: &str) -> Result<CallEnvelope, RpcError> {
    let content_type = req.content_type().unwrap_or_default();

    let args = if content_type == "text/plain" {
        vec![Value::String(req.text().await?)]
    } else {
        // reject bad content types before complaining about the manifest
        let content_type_header = req.header(header::CONTENT_TYPE.as_str()).unwrap_or_default();
        crate::http::request::multipart_boundary(content_type_header)?;

        let manifest = req
            .header(PARAM_TYPES_HEADER)
            .ok_or_else(|| RpcError::Protocol(format!("Missing {PARAM_TYPES_HEADER} header")))?;
        let manifest = TypeManifest::parse(manifest)?;
        let parts = req.form_data().await?;
        reconstruct(parts, &manifest)?
    };

    Ok(CallEnvelope {
        function_name: name.to_string(),
        args,
    })
}

async fn invoke(
    function: &dyn RemoteFunction,
    envelope: CallEnvelope,
    extensions: Extensions,
) -> Result<Value, RpcError> {
    let call = Call {
        function: envelope.function_name,
        args: envelope.args,
        extensions,
    };

    match AssertUnwindSafe(function.invoke(call)).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(RpcError::Invocation(e.to_string())),
        Err(panic) => Err(RpcError::Invocation(panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "function panicked".to_string()
    }
}
