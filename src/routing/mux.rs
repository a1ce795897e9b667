//! Route and middleware dispatch.
//!
//! # Responsibilities
//! - Hold routes and prefix middleware in registration order
//! - Run middleware until one sends a response
//! - Invoke the first route whose method and pattern match
//! - Fall back to `404` when nothing responded
//!
//! # Design Decisions
//! - Immutable once mounted (thread-safe without locks)
//! - Middleware and routes interleave by registration order, not by kind
//! - Middleware match the full url; routes match the path after the
//!   mount prefix is stripped, so a nested mux sees itself rooted at `/`

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use thiserror::Error;

use crate::http::{Request, Response};
use crate::routing::handler::Handler;
use crate::routing::matcher::RoutePattern;

pub const NOT_FOUND_BODY: &str = "Page Not found";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("expected \"METHOD /path\", got {0:?}")]
    Malformed(String),

    #[error("invalid method {0:?}")]
    InvalidMethod(String),
}

struct Route {
    method: Method,
    pattern: RoutePattern,
    handler: Arc<dyn Handler>,
}

enum Entry {
    Route(Route),
    Middleware {
        prefix: String,
        handler: Arc<dyn Handler>,
    },
}

#[derive(Default)]
pub struct Mux {
    entries: Vec<Entry>,
}

impl Mux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route for `method` and `pattern`.
    pub fn register(mut self, method: Method, pattern: &str, handler: impl Handler) -> Self {
        tracing::debug!(method = %method, pattern = %pattern, "Registering route");
        self.entries.push(Entry::Route(Route {
            method,
            pattern: RoutePattern::compile(pattern),
            handler: Arc::new(handler),
        }));
        self
    }

    /// Register a route from a `"METHOD /path"` string.
    pub fn handle_func(self, route: &str, handler: impl Handler) -> Result<Self, RouteError> {
        let (method, pattern) = route
            .trim()
            .split_once(char::is_whitespace)
            .ok_or_else(|| RouteError::Malformed(route.to_string()))?;
        let pattern = pattern.trim();
        if !pattern.starts_with('/') {
            return Err(RouteError::Malformed(route.to_string()));
        }
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| RouteError::InvalidMethod(method.to_string()))?;
        Ok(self.register(method, pattern, handler))
    }

    /// Register middleware for every url starting with `prefix`.
    pub fn handle(mut self, prefix: &str, handler: impl Handler) -> Self {
        tracing::debug!(prefix = %prefix, "Registering middleware");
        self.entries.push(Entry::Middleware {
            prefix: prefix.to_string(),
            handler: Arc::new(handler),
        });
        self
    }

    /// Freeze this mux as a handler whose routes see urls with `prefix`
    /// removed.
    pub fn strip_prefix(self, prefix: impl Into<String>) -> StripPrefix {
        StripPrefix {
            mux: Arc::new(self),
            prefix: prefix.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run the chain for one request.
    pub async fn dispatch(&self, req: &mut Request, res: &mut Response, strip_prefix: &str) {
        for entry in &self.entries {
            match entry {
                Entry::Middleware { prefix, handler } => {
                    if !req.url().starts_with(prefix.as_str()) {
                        continue;
                    }
                    handler.call(req, res).await;
                    if res.is_sent() {
                        metrics::counter!("mux_requests_total", "outcome" => "middleware").increment(1);
                        return;
                    }
                }
                Entry::Route(route) => {
                    if *req.method() != route.method {
                        continue;
                    }
                    let params = {
                        let url = req.url();
                        let url = match url.strip_prefix(strip_prefix) {
                            Some(rest) if !strip_prefix.is_empty() => rest,
                            _ => url,
                        };
                        let path = url.split('?').next().unwrap_or_default();
                        route.pattern.matches(path)
                    };
                    let Some(params) = params else {
                        continue;
                    };

                    tracing::trace!(
                        method = %route.method,
                        pattern = %route.pattern.as_str(),
                        "Route matched"
                    );
                    req.set_path_params(params);
                    route.handler.call(req, res).await;
                    metrics::counter!("mux_requests_total", "outcome" => "route").increment(1);
                    return;
                }
            }
        }

        if res.is_sent() {
            return;
        }
        tracing::debug!(method = %req.method(), url = %req.url(), "No route matched");
        metrics::counter!("mux_requests_total", "outcome" => "not_found").increment(1);
        res.status(StatusCode::NOT_FOUND);
        let _ = res.end(NOT_FOUND_BODY);
    }
}

#[async_trait]
impl Handler for Mux {
    async fn call(&self, req: &mut Request, res: &mut Response) {
        self.dispatch(req, res, "").await
    }
}

/// A mounted mux; see `Mux::strip_prefix`.
#[derive(Clone)]
pub struct StripPrefix {
    mux: Arc<Mux>,
    prefix: String,
}

#[async_trait]
impl Handler for StripPrefix {
    async fn call(&self, req: &mut Request, res: &mut Response) {
        self.mux.dispatch(req, res, &self.prefix).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::handler::handler_fn;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn run(mux: &Mux, method: Method, url: &str) -> Response {
        let mut req = Request::new(method, url);
        let mut res = Response::new();
        mux.call(&mut req, &mut res).await;
        res
    }

    fn echo_params() -> impl Handler {
        handler_fn(|req, res| {
            let mut params: Vec<_> = req
                .path_params()
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            params.sort();
            let _ = res.end(params.join("&"));
        })
    }

    #[tokio::test]
    async fn test_route_binds_params() {
        let mux = Mux::new().register(Method::GET, "/users/:id/*", echo_params());
        let res = run(&mux, Method::GET, "/users/42/a/b?q=1").await;
        assert_eq!(res.body(), b"id=42&wildcard=a/b");

        let res = run(&mux, Method::GET, "/users").await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(res.body(), NOT_FOUND_BODY.as_bytes());
    }

    #[tokio::test]
    async fn test_method_must_match() {
        let mux = Mux::new().register(Method::GET, "/x", echo_params());
        let res = run(&mux, Method::POST, "/x").await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_middleware_short_circuit() {
        let later = Arc::new(AtomicUsize::new(0));
        let (a, b) = (later.clone(), later.clone());
        let mux = Mux::new()
            .handle("/", handler_fn(|_, res| {
                res.status(StatusCode::FORBIDDEN);
                let _ = res.end("stop");
            }))
            .handle("/", handler_fn(move |_, _| {
                a.fetch_add(1, Ordering::SeqCst);
            }))
            .register(Method::GET, "/x", handler_fn(move |_, _| {
                b.fetch_add(1, Ordering::SeqCst);
            }));

        let res = run(&mux, Method::GET, "/x").await;
        assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(res.body(), b"stop");
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_passthrough_middleware_and_registration_order() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let mux = Mux::new()
            .register(Method::GET, "/first", handler_fn(|_, res| {
                let _ = res.end("route");
            }))
            .handle("/", handler_fn(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .register(Method::GET, "/second", handler_fn(|_, res| {
                let _ = res.end("second");
            }));

        // the route registered before the middleware wins without running it
        assert_eq!(run(&mux, Method::GET, "/first").await.body(), b"route");
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        assert_eq!(run(&mux, Method::GET, "/second").await.body(), b"second");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_middleware_prefix() {
        let mux = Mux::new().handle("/api", handler_fn(|_, res| {
            let _ = res.end("api");
        }));
        assert_eq!(run(&mux, Method::GET, "/api/x").await.body(), b"api");
        assert_eq!(
            run(&mux, Method::GET, "/other").await.status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_nested_mux_sees_stripped_paths() {
        let inner = Mux::new().register(Method::GET, "/items/:id", echo_params());
        let outer = Mux::new().handle("/api/v1", inner.strip_prefix("/api/v1"));

        let res = run(&outer, Method::GET, "/api/v1/items/7").await;
        assert_eq!(res.body(), b"id=7");

        let res = run(&outer, Method::GET, "/api/v1/missing").await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_handle_func_parsing() {
        let mux = Mux::new().handle_func("get /a/:b", echo_params()).unwrap();
        assert_eq!(mux.len(), 1);
        assert!(matches!(
            Mux::new().handle_func("/a", echo_params()),
            Err(RouteError::Malformed(_))
        ));
        assert!(matches!(
            Mux::new().handle_func("GET a", echo_params()),
            Err(RouteError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_handle_func_dispatch() {
        let mux = Mux::new().handle_func("DELETE /a/:b", echo_params()).unwrap();
        assert_eq!(run(&mux, Method::DELETE, "/a/c").await.body(), b"b=c");
    }
}
