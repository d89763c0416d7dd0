use indexmap::IndexMap;
use thiserror::Error;

/// Top-level error type for the `adminkit-api` crate.
///
/// Every non-2xx response is classified by HTTP status into one of the
/// variants below. `adminkit-core` maps these into user-facing messages.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authorization ───────────────────────────────────────────────
    /// HTTP 401: the session is missing or expired.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// HTTP 403: authenticated, but not allowed to perform the action.
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    // ── Request ─────────────────────────────────────────────────────
    /// HTTP 404.
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// HTTP 422 with `{ errors: { field: [msg, ..] } }`.
    ///
    /// `message` already aggregates every field message.
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: IndexMap<String, Vec<String>>,
    },

    /// HTTP 429. `retry_after_secs` comes from the `Retry-After` header.
    #[error("Rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    /// HTTP 5xx.
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// Any other non-success status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup error (unreadable or invalid CA certificate).
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::RateLimited { .. } | Self::Server { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The HTTP status that produced this error, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { .. } => Some(401),
            Self::PermissionDenied { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Validation { .. } => Some(422),
            Self::RateLimited { .. } => Some(429),
            Self::Server { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::InvalidUrl(_)
            | Self::Timeout { .. }
            | Self::Tls(_)
            | Self::Deserialization { .. } => None,
        }
    }
}
