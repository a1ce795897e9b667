//! The handler contract shared by routes and middleware.

use std::sync::Arc;

use async_trait::async_trait;

use crate::http::{Request, Response};

/// Anything that can take part in dispatch.
///
/// A handler either sends a response with `Response::end`, which stops the
/// chain, or returns without sending to let the next entry run.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, req: &mut Request, res: &mut Response);
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn call(&self, req: &mut Request, res: &mut Response) {
        (**self).call(req, res).await
    }
}

/// Adapter for synchronous closures.
pub struct HandlerFn<F>(F);

/// Wrap a closure as a `Handler`.
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&mut Request, &mut Response) + Send + Sync + 'static,
{
    HandlerFn(f)
}

#[async_trait]
impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut Request, &mut Response) + Send + Sync + 'static,
{
    async fn call(&self, req: &mut Request, res: &mut Response) {
        (self.0)(req, res)
    }
}
