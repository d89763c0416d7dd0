//! Data-fetching primitives shared by every adminkit console screen.
//!
//! - **[`ResultCache`]**: process-wide cache of paginated list results,
//!   keyed by a normalized fingerprint of the query ([`CacheKey`]).
//!   Concurrent misses for the same key are coalesced into one request.
//!
//! - **[`ListController`]**: page / per-page / search / filter state for
//!   one list screen. Every setter performs a cache-first fetch;
//!   [`refresh()`](ListController::refresh) always reaches the network.
//!   Consumers observe a [`ListView`] through a `watch` channel.
//!
//! - **[`JobMonitor`]**: submit → poll → terminal state machine for one
//!   long-running server job, with a re-entrancy guard, a bounded number
//!   of polls, and cancellation that suppresses late results.
//!
//! - **[`Notifier`]**: sink for the transient user-facing messages both
//!   components emit on failure.

pub mod cache;
pub mod config;
pub mod error;
pub mod job;
pub mod list;
pub mod notify;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{CacheEntry, CacheKey, CacheStats, ResultCache, compute_key};
pub use config::{CachePolicy, PollSettings};
pub use error::{JobError, JobErrorKind, JobStage};
pub use job::{
    HttpJobBackend, JobBackend, JobMonitor, JobMonitorBuilder, JobPhase, JobRun, TargetId,
};
pub use list::{FetchRequest, ListController, ListQueryState, ListSource, ListView};
pub use notify::{Notice, NoticeLevel, Notifier, TracingNotifier};

pub use adminkit_api::{FilterValue, Filters, JobStats, Record};
