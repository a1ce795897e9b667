//! HTTP server setup and connection handling.
//!
//! # Responsibilities
//! - Wrap the root `Mux` in an Axum router with tower-http middleware
//!   (timeout, request ID, tracing)
//! - Accept connections through the bounded `Listener`
//! - Serve HTTP/1.1 and HTTP/2 per connection via hyper-util
//! - Drain in-flight connections on shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::Router;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::sync::broadcast;
use tower::Service;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::http::request_id::UuidRequestId;
use crate::http::{Request, Response};
use crate::multipart::Limits;
use crate::net::{ConnectionTracker, Listener, ListenerError};
use crate::observability::metrics;
use crate::routing::Mux;

/// Application state injected into the fallback handler.
#[derive(Clone)]
struct AppState {
    mux: Arc<Mux>,
    limits: Limits,
    body_idle: Duration,
}

/// HTTP server for a root `Mux`.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    pub fn new(config: ServerConfig, mux: Mux) -> Self {
        let state = AppState {
            mux: Arc::new(mux),
            limits: config.limits.to_limits(),
            body_idle: config.timeouts.body_idle(),
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .fallback(mux_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(config.timeouts.request()))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// Accept connections until `shutdown` fires, then drain.
    ///
    /// The sender behind `shutdown` must stay alive while the server runs;
    /// a closed channel counts as a shutdown signal.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let tracker = ConnectionTracker::new();

        loop {
            let (stream, peer_addr, permit) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(ListenerError::Closed) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        continue;
                    }
                },
                _ = shutdown.recv() => break,
            };

            let guard = tracker.track();
            metrics::set_active_connections(tracker.active_count());

            let router = self.router.clone();
            let tracker = tracker.clone();
            let mut stop = shutdown.resubscribe();

            tokio::spawn(async move {
                let _permit = permit;
                let connection_id = guard.id();
                let service = hyper::service::service_fn(move |request: hyper::Request<Incoming>| {
                    router.clone().call(request)
                });

                let builder = auto::Builder::new(TokioExecutor::new());
                let conn = builder.serve_connection(TokioIo::new(stream), service);
                tokio::pin!(conn);

                let result = tokio::select! {
                    result = conn.as_mut() => result,
                    _ = stop.recv() => {
                        conn.as_mut().graceful_shutdown();
                        conn.as_mut().await
                    }
                };
                if let Err(e) = result {
                    tracing::debug!(
                        connection_id = %connection_id,
                        peer_addr = %peer_addr,
                        error = %e,
                        "Connection closed with error"
                    );
                }

                drop(guard);
                metrics::set_active_connections(tracker.active_count());
            });
        }

        drop(listener);
        tracing::info!(
            active_connections = tracker.active_count(),
            "Stopped accepting, draining connections"
        );

        let grace = self.config.timeouts.shutdown_grace();
        if tokio::time::timeout(grace, tracker.wait_idle()).await.is_err() {
            tracing::warn!(
                remaining = tracker.active_count(),
                grace_secs = grace.as_secs(),
                "Shutdown grace period elapsed with open connections"
            );
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Every request goes through the root mux.
async fn mux_handler(
    State(state): State<AppState>,
    request: axum::extract::Request,
) -> axum::response::Response {
    let mut req = Request::from_http(request, state.limits, state.body_idle);
    let mut res = Response::new();
    state.mux.dispatch(&mut req, &mut res, "").await;
    res.into_http()
}
