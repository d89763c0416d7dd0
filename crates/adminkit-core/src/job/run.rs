// ── Job run state ──

use std::fmt;

use chrono::{DateTime, Utc};

use adminkit_api::JobStats;

use crate::error::JobError;

/// Identifier of the resource a job operates on (e.g. a mailbox id).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for TargetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for TargetId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Lifecycle phase of a monitored job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum JobPhase {
    Idle,
    /// Waiting for the user to confirm the action.
    Confirming,
    Submitting,
    /// Accepted by the server; first poll pending.
    Queued,
    Polling,
    Completed,
    Failed,
    /// Stopped waiting after the attempt cap. Not a failure.
    TimedOut,
}

impl JobPhase {
    /// Completed, Failed or TimedOut.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }

    /// A run owns the monitor (Submitting, Queued or Polling).
    pub fn is_active(self) -> bool {
        matches!(self, Self::Submitting | Self::Queued | Self::Polling)
    }
}

/// Observable state of one monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRun {
    pub target: TargetId,
    pub phase: JobPhase,
    /// Status polls issued by the current run.
    pub attempts: u32,
    pub result: Option<JobStats>,
    pub error: Option<JobError>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobRun {
    pub fn idle(target: TargetId) -> Self {
        Self {
            target,
            phase: JobPhase::Idle,
            attempts: 0,
            result: None,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Return to Idle for the same target.
    pub(crate) fn reset(&mut self) {
        *self = Self::idle(self.target.clone());
    }

    pub(crate) fn finish(&mut self, phase: JobPhase) {
        self.phase = phase;
        self.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_and_active_phases_are_disjoint() {
        let all = [
            JobPhase::Idle,
            JobPhase::Confirming,
            JobPhase::Submitting,
            JobPhase::Queued,
            JobPhase::Polling,
            JobPhase::Completed,
            JobPhase::Failed,
            JobPhase::TimedOut,
        ];
        for phase in all {
            assert!(!(phase.is_terminal() && phase.is_active()), "{phase}");
        }
        assert_eq!(all.iter().filter(|p| p.is_terminal()).count(), 3);
    }

    #[test]
    fn phase_display_is_snake_case() {
        assert_eq!(JobPhase::TimedOut.to_string(), "timed_out");
    }

    #[test]
    fn reset_keeps_target() {
        let mut run = JobRun::idle(TargetId::from(42_u64));
        run.phase = JobPhase::Failed;
        run.attempts = 3;
        run.reset();
        assert_eq!(run, JobRun::idle(TargetId::from("42")));
    }
}
