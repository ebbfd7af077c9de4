//! Serving views over HTTP.
//!
//! [`CrudApp`] mounts views at exact paths and turns them into an axum
//! router. Every request runs inside its own tracing span and passes
//! through `tower-http`'s trace layer; unknown paths answer 404.
//!
//! # Examples
//!
//! ```no_run
//! use singleurlcrud_core::Settings;
//! use singleurlcrud_http::{HttpRequest, HttpResponse};
//! use singleurlcrud_views::server::CrudApp;
//! use singleurlcrud_views::view::BoxFuture;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let hello = Arc::new(|_req: HttpRequest| -> BoxFuture {
//!     Box::pin(async { HttpResponse::ok("Hello!") })
//! });
//! let app = CrudApp::new(Settings::default()).route("/", hello);
//! // app.run("127.0.0.1:8000").await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::response::IntoResponse;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use singleurlcrud_core::logging::request_span;
use singleurlcrud_core::{CrudError, CrudResult, Settings};
use singleurlcrud_http::{HttpRequest, HttpResponse};

use crate::view::ViewFunction;

/// The scripts and stylesheets the built-in templates reference, for
/// [`CrudApp::static_dir`].
pub const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Upper bound on buffered request bodies.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// An application: views mounted at paths, plus optional static files.
pub struct CrudApp {
    routes: HashMap<String, ViewFunction>,
    static_files: Option<(String, PathBuf)>,
    settings: Settings,
}

impl CrudApp {
    pub fn new(settings: Settings) -> Self {
        Self {
            routes: HashMap::new(),
            static_files: None,
            settings,
        }
    }

    /// Mounts `view` at exactly `path`. A later mount at the same path
    /// replaces the earlier one.
    #[must_use]
    pub fn route(mut self, path: &str, view: ViewFunction) -> Self {
        if self.routes.insert(path.to_string(), view).is_some() {
            tracing::warn!(path, "route mounted twice; keeping the last");
        }
        self
    }

    /// Serves files under `dir` at the settings' `static_url`.
    #[must_use]
    pub fn static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let prefix = format!("/{}", self.settings.static_url.trim_matches('/'));
        self.static_files = Some((prefix, dir.into()));
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Mounted paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    /// Converts the application into an axum router.
    pub fn into_axum_router(self) -> axum::Router {
        let routes = Arc::new(self.routes);
        let next_id = Arc::new(AtomicU64::new(1));

        let handler = move |req: Request<Body>| {
            let routes = Arc::clone(&routes);
            let id = next_id.fetch_add(1, Ordering::Relaxed);
            let span = request_span(id, req.method().as_str(), req.uri().path());

            async move {
                let (parts, body) = req.into_parts();
                let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
                    Ok(bytes) => bytes.to_vec(),
                    Err(e) => {
                        tracing::warn!(error = %e, "unreadable request body");
                        let err = CrudError::BadRequest(e.to_string());
                        return HttpResponse::from_error(&err).into_response();
                    }
                };
                let request = HttpRequest::from_axum(parts, body);
                let response = match routes.get(request.path()) {
                    Some(view) => view(request).await,
                    None => {
                        tracing::debug!(path = request.path(), "no route");
                        HttpResponse::not_found("<h1>Not Found</h1>")
                    }
                };
                tracing::debug!(status = response.status().as_u16(), "response");
                response.into_response()
            }
            .instrument(span)
        };

        let mut router = axum::Router::new();
        if let Some((prefix, dir)) = self.static_files {
            router = router.nest_service(&prefix, ServeDir::new(dir));
        }
        router
            .fallback(handler)
            .layer(TraceLayer::new_for_http())
    }

    /// Binds `addr` and serves until the process is stopped.
    pub async fn run(self, addr: &str) -> CrudResult<()> {
        let paths: Vec<String> = self.paths().iter().map(ToString::to_string).collect();
        let router = self.into_axum_router();
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            CrudError::ConfigurationError(format!("Failed to bind to {addr}: {e}"))
        })?;
        tracing::info!(addr, ?paths, "serving at http://{addr}/");
        axum::serve(listener, router).await?;
        Ok(())
    }
}

impl std::fmt::Debug for CrudApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudApp")
            .field("paths", &self.paths())
            .field("static_files", &self.static_files)
            .field("debug", &self.settings.debug)
            .finish()
    }
}
