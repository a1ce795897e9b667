//! Per-request context resolution.
//!
//! Runs a resolver against each request and attaches what it returns to
//! the request extensions. Remote functions read it back through
//! `Call::extension::<T>()`.

use std::marker::PhantomData;

use async_trait::async_trait;
use axum::http::StatusCode;

use crate::http::{Request, Response};
use crate::routing::Handler;

/// Middleware that resolves a `T` for every request.
pub struct AuthContext<F, T> {
    resolve: F,
    required: bool,
    _context: PhantomData<fn() -> T>,
}

impl<F, T> AuthContext<F, T>
where
    F: Fn(&Request) -> Option<T> + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new(resolve: F) -> Self {
        Self {
            resolve,
            required: false,
            _context: PhantomData,
        }
    }

    /// Answer `401` when the resolver finds nothing.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

#[async_trait]
impl<F, T> Handler for AuthContext<F, T>
where
    F: Fn(&Request) -> Option<T> + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    async fn call(&self, req: &mut Request, res: &mut Response) {
        match (self.resolve)(req) {
            Some(context) => {
                req.extensions_mut().insert(context);
            }
            None if self.required => {
                tracing::debug!(path = %req.path(), "Request without auth context rejected");
                res.status(StatusCode::UNAUTHORIZED);
                if let Err(e) = res.end("Unauthorized") {
                    tracing::warn!(error = %e, "Failed to send auth response");
                }
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    #[derive(Clone, Debug, PartialEq)]
    struct User(String);

    fn user_from_header(req: &Request) -> Option<User> {
        req.header("x-user").map(|name| User(name.to_string()))
    }

    #[tokio::test]
    async fn test_context_is_attached() {
        let auth = AuthContext::new(user_from_header);
        let mut req = Request::new(Method::POST, "/api").with_header("x-user", "ada");
        let mut res = Response::new();

        auth.call(&mut req, &mut res).await;
        assert!(!res.is_sent());
        assert_eq!(req.extensions().get::<User>(), Some(&User("ada".into())));
    }

    #[tokio::test]
    async fn test_optional_context_passes_through() {
        let auth = AuthContext::new(user_from_header);
        let mut req = Request::new(Method::POST, "/api");
        let mut res = Response::new();

        auth.call(&mut req, &mut res).await;
        assert!(!res.is_sent());
        assert!(req.extensions().get::<User>().is_none());
    }

    #[tokio::test]
    async fn test_required_context_rejects() {
        let auth = AuthContext::new(user_from_header).required();
        let mut req = Request::new(Method::POST, "/api");
        let mut res = Response::new();

        auth.call(&mut req, &mut res).await;
        assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    }
}
