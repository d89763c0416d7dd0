// ── Job error taxonomy ──
//
// User-facing failures of a background job. Consumers never see HTTP
// status codes directly: `JobError::from_api` classifies transport-layer
// errors into a fixed set of kinds, each with its own message.

use thiserror::Error;

use adminkit_api::Error as ApiError;

/// Which step of a run produced the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum JobStage {
    /// The `POST …/sync` request.
    Submit,
    /// A status poll, or the attempt cap.
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum JobErrorKind {
    Authentication,
    PermissionDenied,
    NotFound,
    /// 422; the message aggregates every field error.
    Validation,
    RateLimited,
    /// 5xx or an unreadable response.
    Server,
    /// Any other 4xx.
    Rejected,
    /// Connection failure or request timeout.
    Network,
    /// The server reported `status: failed`.
    JobFailed,
    /// The attempt cap was reached. The job may still finish server-side.
    TimedOut,
}

/// A classified, displayable job failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct JobError {
    pub kind: JobErrorKind,
    pub stage: JobStage,
    pub message: String,
}

impl JobError {
    pub fn new(kind: JobErrorKind, stage: JobStage, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage,
            message: message.into(),
        }
    }

    /// Classify a transport-layer error.
    pub fn from_api(err: &ApiError, stage: JobStage) -> Self {
        let (kind, message) = match err {
            ApiError::Authentication { .. } => (
                JobErrorKind::Authentication,
                "Your session has expired. Please sign in again.".to_owned(),
            ),
            ApiError::PermissionDenied { .. } => (
                JobErrorKind::PermissionDenied,
                "You do not have permission to run this sync.".to_owned(),
            ),
            ApiError::NotFound { .. } => (
                JobErrorKind::NotFound,
                "The account to sync could not be found.".to_owned(),
            ),
            ApiError::Validation { message, .. } => (JobErrorKind::Validation, message.clone()),
            ApiError::RateLimited { retry_after_secs } => (
                JobErrorKind::RateLimited,
                retry_after_secs.map_or_else(
                    || "Too many sync requests. Please wait before trying again.".to_owned(),
                    |secs| format!("Too many sync requests. Please wait {secs}s before trying again."),
                ),
            ),
            ApiError::Server { .. } | ApiError::Deserialization { .. } => (
                JobErrorKind::Server,
                "The server encountered an error. Please try again later.".to_owned(),
            ),
            ApiError::Api { message, .. } => (JobErrorKind::Rejected, message.clone()),
            ApiError::Transport(_)
            | ApiError::Timeout { .. }
            | ApiError::InvalidUrl(_)
            | ApiError::Tls(_) => (
                JobErrorKind::Network,
                "Could not reach the server. Check your connection and try again.".to_owned(),
            ),
        };
        Self {
            kind,
            stage,
            message,
        }
    }

    /// The server reported the job itself as failed.
    pub fn job_failed(detail: Option<&str>) -> Self {
        Self::new(
            JobErrorKind::JobFailed,
            JobStage::Poll,
            detail
                .filter(|d| !d.trim().is_empty())
                .unwrap_or("The sync failed on the server."),
        )
    }

    /// The monitor stopped waiting after `attempts` polls.
    pub fn timed_out(attempts: u32) -> Self {
        Self::new(
            JobErrorKind::TimedOut,
            JobStage::Poll,
            format!(
                "The sync is taking longer than expected ({attempts} checks). \
                 It may still be running in the background; check back later."
            ),
        )
    }
}
