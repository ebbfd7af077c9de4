//! Core error types for singleurlcrud.
//!
//! [`CrudError`] is the single error enum every crate in the workspace
//! returns. It covers the controller's taxonomy (not found, validation,
//! integrity, configuration) plus the storage, template, and IO failures
//! that propagate up as server errors.

use thiserror::Error;

/// The primary error type for singleurlcrud.
///
/// Each variant maps to an HTTP status code via [`CrudError::status_code`].
/// `NotFound` is deliberately coarse: the controller uses it for a missing
/// entity, a disabled operation, a failed permission check, and a failed
/// per-item predicate alike.
#[derive(Error, Debug)]
pub enum CrudError {
    // ── HTTP errors ──────────────────────────────────────────────────

    /// HTTP 400 Bad Request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// HTTP 404 Not Found.
    #[error("Not found: {0}")]
    NotFound(String),

    // ── Validation ───────────────────────────────────────────────────

    /// Submitted form or formset data did not validate.
    ///
    /// Raised inside a transaction to force a rollback; the controller
    /// recovers from it by re-rendering the form.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    // ── Storage errors ───────────────────────────────────────────────

    /// A uniqueness or referential constraint was violated.
    #[error("Integrity error: {0}")]
    IntegrityError(String),

    /// A generic storage error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// The store is in a state that does not allow the operation
    /// (e.g. committing without an open transaction).
    #[error("Operational error: {0}")]
    OperationalError(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A resource was wired incorrectly (unknown display field, missing
    /// label, bad settings file). Not recoverable at request time.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── Templates ────────────────────────────────────────────────────

    /// A template could not be found or failed to render.
    #[error("Template error: {0}")]
    TemplateError(String),

    // ── Serialization ────────────────────────────────────────────────

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    // ── Security ─────────────────────────────────────────────────────

    /// A request tried something that is never legitimate, such as
    /// mutating an immutable query dictionary.
    #[error("Suspicious operation: {0}")]
    SuspiciousOperation(String),
}

impl CrudError {
    /// Returns the HTTP status code associated with this error.
    ///
    /// - `BadRequest`, `ValidationFailed` -> 400
    /// - `SuspiciousOperation` -> 403
    /// - `NotFound` -> 404
    /// - Everything else -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) | Self::ValidationFailed(_) => 400,
            Self::SuspiciousOperation(_) => 403,
            Self::NotFound(_) => 404,
            Self::IntegrityError(_)
            | Self::DatabaseError(_)
            | Self::OperationalError(_)
            | Self::ConfigurationError(_)
            | Self::TemplateError(_)
            | Self::SerializationError(_)
            | Self::IoError(_) => 500,
        }
    }

    /// Returns `true` for errors the controller folds back into a form
    /// instead of turning into an error response.
    pub const fn is_form_recoverable(&self) -> bool {
        matches!(self, Self::ValidationFailed(_) | Self::IntegrityError(_))
    }
}

impl From<serde_json::Error> for CrudError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// A convenience type alias for `Result<T, CrudError>`.
pub type CrudResult<T> = Result<T, CrudError>;
