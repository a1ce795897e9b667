//! Static file serving.
//!
//! # Responsibilities
//! - Serve files under a root directory for `GET` requests
//! - Map `/` to `index.html`
//! - Refuse paths that leave the root
//!
//! Missing files are not an error: the request falls through to the next
//! handler, usually ending in the mux's 404.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use axum::http::{Method, StatusCode};

use crate::http::{Request, Response};
use crate::routing::Handler;

const FORBIDDEN_BODY: &str = "Forbidden";

/// Serves files from `root`.
#[derive(Debug, Clone)]
pub struct ServeDir {
    root: PathBuf,
}

impl ServeDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a request path below the root, or `None` if it escapes.
    fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let relative = match request_path {
            "/" => "index.html",
            path => path.trim_start_matches('/'),
        };
        let relative = Path::new(relative);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match ext.as_deref() {
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl Handler for ServeDir {
    async fn call(&self, req: &mut Request, res: &mut Response) {
        if req.method() != Method::GET {
            return;
        }

        let Some(file_path) = self.resolve(req.path()) else {
            tracing::warn!(path = %req.path(), "Rejected path outside static root");
            res.status(StatusCode::FORBIDDEN);
            if let Err(e) = res.end(FORBIDDEN_BODY) {
                tracing::warn!(error = %e, "Failed to send static response");
            }
            return;
        };

        let contents = match tokio::fs::read(&file_path).await {
            Ok(contents) => contents,
            Err(e) => {
                tracing::trace!(path = %file_path.display(), error = %e, "Static file not served");
                return;
            }
        };

        res.status(StatusCode::OK)
            .set_header("content-type", content_type_for(&file_path));
        if let Err(e) = res.end(contents) {
            tracing::warn!(error = %e, "Failed to send static response");
        }
    }
}
