//! CLI error types with miette diagnostics.
//!
//! Maps configuration, transport and job failures into user-facing errors
//! with actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use adminkit_config::ConfigError;
use adminkit_core::{JobError, JobErrorKind};

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("No API base URL configured")]
    #[diagnostic(
        code(adminkit::no_base_url),
        help(
            "Pass --base-url (or set ADMINKIT_BASE_URL),\n\
             or set api.base_url in {path}"
        )
    )]
    NoBaseUrl { path: String },

    #[error(transparent)]
    #[diagnostic(code(adminkit::config))]
    Config(#[from] ConfigError),

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(adminkit::validation))]
    Validation { field: String, reason: String },

    #[error("TLS setup failed: {reason}")]
    #[diagnostic(
        code(adminkit::tls),
        help("Check api.ca_cert points at a readable PEM certificate.")
    )]
    Tls { reason: String },

    // ── Requests ─────────────────────────────────────────────────────

    #[error("Could not load {resource}")]
    #[diagnostic(
        code(adminkit::list_failed),
        help("{detail}\nRun with -v for request details.")
    )]
    ListFailed { resource: String, detail: String },

    #[error("{message}")]
    #[diagnostic(
        code(adminkit::auth_failed),
        help("Check the API credentials configured for this backend.")
    )]
    AuthFailed { message: String },

    #[error("{message}")]
    #[diagnostic(code(adminkit::permission_denied))]
    PermissionDenied { message: String },

    #[error("{resource} '{identifier}' not found")]
    #[diagnostic(
        code(adminkit::not_found),
        help("Run: adminkit list {resource} to see available records")
    )]
    NotFound { resource: String, identifier: String },

    #[error("Could not reach the API")]
    #[diagnostic(
        code(adminkit::connection_failed),
        help("{message}\nCheck the base URL and that the backend is running.")
    )]
    ConnectionFailed { message: String },

    // ── Jobs ─────────────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(code(adminkit::job_failed))]
    JobFailed { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(adminkit::job_timed_out),
        help("Run the same sync command again later to check on it.")
    )]
    JobTimedOut { message: String },

    // ── Interactive ──────────────────────────────────────────────────

    #[error("'{action}' requires confirmation")]
    #[diagnostic(
        code(adminkit::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    #[error("Interrupted")]
    #[diagnostic(
        code(adminkit::interrupted),
        help("Stopped waiting. The job itself keeps running on the server.")
    )]
    Interrupted,

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(adminkit::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoBaseUrl { .. }
            | Self::Config(_)
            | Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::PermissionDenied { .. } => exit_code::PERMISSION,
            Self::ConnectionFailed { .. } | Self::Tls { .. } => exit_code::CONNECTION,
            Self::JobTimedOut { .. } => exit_code::TIMEOUT,
            Self::Interrupted => exit_code::INTERRUPTED,
            Self::ListFailed { .. } | Self::JobFailed { .. } | Self::Io(_) | Self::Json(_) => {
                exit_code::GENERAL
            }
        }
    }

    /// Classify a finished job's error. `resource` and `identifier` name the
    /// record in not-found hints.
    pub fn from_job(err: JobError, resource: &str, identifier: &str) -> Self {
        let message = err.message;
        match err.kind {
            JobErrorKind::Authentication => Self::AuthFailed { message },
            JobErrorKind::PermissionDenied => Self::PermissionDenied { message },
            JobErrorKind::NotFound => Self::NotFound {
                resource: resource.into(),
                identifier: identifier.into(),
            },
            JobErrorKind::Validation => Self::Validation {
                field: "sync".into(),
                reason: message,
            },
            JobErrorKind::Network => Self::ConnectionFailed { message },
            JobErrorKind::TimedOut => Self::JobTimedOut { message },
            JobErrorKind::RateLimited
            | JobErrorKind::Server
            | JobErrorKind::Rejected
            | JobErrorKind::JobFailed => Self::JobFailed { message },
        }
    }
}

// ── API error → CliError mapping ─────────────────────────────────────

impl From<adminkit_api::Error> for CliError {
    fn from(err: adminkit_api::Error) -> Self {
        use adminkit_api::Error as ApiError;

        match err {
            ApiError::InvalidUrl(e) => Self::Validation {
                field: "base-url".into(),
                reason: e.to_string(),
            },
            ApiError::Tls(reason) => Self::Tls { reason },
            other => Self::ConnectionFailed {
                message: other.to_string(),
            },
        }
    }
}
