//! Logging integration.
//!
//! Configures a [`tracing`] subscriber from [`Settings`] and creates
//! per-request spans for the server.

use crate::settings::Settings;

/// Sets up the global tracing subscriber based on the given settings.
///
/// The filter is read from `settings.log_level` (any `EnvFilter` directive,
/// e.g. `"info"` or `"singleurlcrud_views=debug"`). In debug mode a pretty,
/// human-readable format is used; otherwise structured JSON.
///
/// Installing a second subscriber is a no-op, so tests and binaries can
/// both call this freely.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span for one HTTP request.
///
/// # Examples
///
/// ```
/// use singleurlcrud_core::logging::request_span;
///
/// let span = request_span(7, "GET", "/polls/questions/");
/// let _guard = span.enter();
/// tracing::info!("handling request");
/// ```
pub fn request_span(request_id: u64, method: &str, path: &str) -> tracing::Span {
    tracing::info_span!("request", id = request_id, method = method, path = path)
}
