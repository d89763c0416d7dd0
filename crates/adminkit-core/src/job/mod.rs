// ── Background job monitor ──
//
// Drives submit → queued → poll → terminal for one server-side job per
// monitor. Each run is a spawned task owning a child `CancellationToken`;
// every state change it makes goes through `apply`, which checks the
// token under the same lock `close()` takes, so nothing a run does is
// observable after the run has been stopped.

mod backend;
mod run;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use adminkit_api::{JobState, JobStats, JobStatus};

use crate::config::PollSettings;
use crate::error::{JobError, JobStage};
use crate::notify::{Notice, Notifier, TracingNotifier};

pub use backend::{HttpJobBackend, JobBackend};
pub use run::{JobPhase, JobRun, TargetId};

type CompletionHook = Arc<dyn Fn(&JobStats) + Send + Sync>;

// ── Builder ──────────────────────────────────────────────────────────

/// Configures a [`JobMonitor`] before it is created.
pub struct JobMonitorBuilder<B> {
    backend: B,
    target: TargetId,
    settings: PollSettings,
    notifier: Arc<dyn Notifier>,
    on_complete: Option<CompletionHook>,
}

impl<B: JobBackend> JobMonitorBuilder<B> {
    pub fn settings(mut self, settings: PollSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Called once each time a run reaches Completed.
    pub fn on_complete(mut self, hook: impl Fn(&JobStats) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> JobMonitor<B> {
        let (state, _) = watch::channel(JobRun::idle(self.target));
        JobMonitor {
            inner: Arc::new(MonitorInner {
                backend: self.backend,
                settings: self.settings,
                notifier: self.notifier,
                on_complete: self.on_complete,
                state,
                submitting: AtomicBool::new(false),
                current: Mutex::new(None),
                root: CancellationToken::new(),
            }),
        }
    }
}

// ── JobMonitor ───────────────────────────────────────────────────────

/// Tracks one background job for one target.
///
/// Must be used from within a tokio runtime: [`start()`](Self::start)
/// spawns the run. Dropping the monitor stops any run in progress.
pub struct JobMonitor<B: JobBackend> {
    inner: Arc<MonitorInner<B>>,
}

struct MonitorInner<B> {
    backend: B,
    settings: PollSettings,
    notifier: Arc<dyn Notifier>,
    on_complete: Option<CompletionHook>,
    state: watch::Sender<JobRun>,
    /// Set synchronously by `start()`, cleared once the submit resolves.
    submitting: AtomicBool,
    current: Mutex<Option<RunHandle>>,
    root: CancellationToken,
}

struct RunHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl RunHandle {
    fn stop(self) {
        self.token.cancel();
        self.task.abort();
    }
}

impl<B: JobBackend> JobMonitor<B> {
    pub fn builder(backend: B, target: impl Into<TargetId>) -> JobMonitorBuilder<B> {
        JobMonitorBuilder {
            backend,
            target: target.into(),
            settings: PollSettings::default(),
            notifier: Arc::new(TracingNotifier),
            on_complete: None,
        }
    }

    /// A monitor with default settings that logs its notices.
    pub fn new(backend: B, target: impl Into<TargetId>) -> Self {
        Self::builder(backend, target).build()
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn snapshot(&self) -> JobRun {
        self.inner.state.borrow().clone()
    }

    pub fn phase(&self) -> JobPhase {
        self.inner.state.borrow().phase
    }

    pub fn target(&self) -> TargetId {
        self.inner.state.borrow().target.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<JobRun> {
        self.inner.state.subscribe()
    }

    pub fn settings(&self) -> &PollSettings {
        &self.inner.settings
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Idle → Confirming.
    pub fn confirm(&self) -> bool {
        let _current = self.inner.lock_current();
        self.inner.state.send_if_modified(|run| {
            if run.phase == JobPhase::Idle {
                run.phase = JobPhase::Confirming;
                true
            } else {
                false
            }
        })
    }

    /// Confirming → Idle.
    pub fn cancel_confirm(&self) -> bool {
        let _current = self.inner.lock_current();
        self.inner.state.send_if_modified(|run| {
            if run.phase == JobPhase::Confirming {
                run.phase = JobPhase::Idle;
                true
            } else {
                false
            }
        })
    }

    /// Submit the job and start watching it.
    ///
    /// Accepted from Idle, Confirming, or a Failed caused by the submit
    /// request itself. Returns `false` (and logs) when a submission is
    /// already in flight or the monitor is busy or holds a result that
    /// must be cleared with [`retry()`](Self::retry) or
    /// [`reset()`](Self::reset) first.
    pub fn start(&self) -> bool {
        let inner = &self.inner;
        if inner
            .submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(job = %self.target(), "submission already in flight; start ignored");
            return false;
        }

        let mut current = inner.lock_current();
        let accepted = inner.state.send_if_modified(|run| {
            let allowed = match run.phase {
                JobPhase::Idle | JobPhase::Confirming => true,
                JobPhase::Failed => run
                    .error
                    .as_ref()
                    .is_some_and(|e| e.stage == JobStage::Submit),
                _ => false,
            };
            if allowed {
                run.reset();
                run.phase = JobPhase::Submitting;
                run.started_at = Some(Utc::now());
            }
            allowed
        });

        if !accepted {
            inner.submitting.store(false, Ordering::Release);
            warn!(
                job = %self.target(),
                phase = %self.phase(),
                "start rejected; retry() or reset() first"
            );
            return false;
        }

        if let Some(previous) = current.take() {
            previous.stop();
        }
        let token = inner.root.child_token();
        let target = self.target();
        debug!(job = %target, "submitting sync");
        let task = tokio::spawn(drive(Arc::clone(inner), target, token.clone()));
        *current = Some(RunHandle { token, task });
        true
    }

    /// Completed | Failed | TimedOut → Idle, clearing attempts, error and
    /// result.
    pub fn retry(&self) -> bool {
        let _current = self.inner.lock_current();
        self.inner.state.send_if_modified(|run| {
            if run.phase.is_terminal() {
                run.reset();
                true
            } else {
                false
            }
        })
    }

    /// Return to Idle from any phase without an active run.
    ///
    /// Use [`close()`](Self::close) to abandon an active run.
    pub fn reset(&self) -> bool {
        let _current = self.inner.lock_current();
        let mut allowed = false;
        self.inner.state.send_if_modified(|run| {
            allowed = !run.phase.is_active();
            if allowed && run.phase != JobPhase::Idle {
                run.reset();
                return true;
            }
            false
        });
        allowed
    }

    /// Stop watching: cancel polling, discard any in-flight response and
    /// return to Idle. The server-side job is not cancelled.
    pub fn close(&self) {
        let mut current = self.inner.lock_current();
        if let Some(run) = current.take() {
            run.stop();
            debug!(job = %self.target(), "stopped watching sync");
        }
        self.inner.submitting.store(false, Ordering::Release);
        self.inner.state.send_modify(JobRun::reset);
    }

    /// Stop any run and start over for a different target.
    pub fn bind_target(&self, target: impl Into<TargetId>) {
        let target = target.into();
        let mut current = self.inner.lock_current();
        if let Some(run) = current.take() {
            run.stop();
        }
        self.inner.submitting.store(false, Ordering::Release);
        self.inner
            .state
            .send_modify(|run| *run = JobRun::idle(target));
    }
}

impl<B: JobBackend> Drop for JobMonitor<B> {
    fn drop(&mut self) {
        self.inner.root.cancel();
        if let Some(run) = self.inner.lock_current().take() {
            run.stop();
        }
    }
}

impl<B> MonitorInner<B> {
    fn lock_current(&self) -> MutexGuard<'_, Option<RunHandle>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate the run state if the run owning `token` is still live.
    fn apply(&self, token: &CancellationToken, f: impl FnOnce(&mut JobRun)) -> bool {
        let _current = self.lock_current();
        if token.is_cancelled() {
            return false;
        }
        self.state.send_modify(f);
        true
    }

    /// Like `apply`, and releases the submission guard for a live run.
    fn settle_submission(&self, token: &CancellationToken, f: impl FnOnce(&mut JobRun)) -> bool {
        let _current = self.lock_current();
        if token.is_cancelled() {
            return false;
        }
        self.submitting.store(false, Ordering::Release);
        self.state.send_modify(f);
        true
    }
}

// ── Run task ─────────────────────────────────────────────────────────

enum PollOutcome {
    Completed(JobStats),
    Failed(JobError),
    Pending,
}

fn classify(target: &TargetId, status: JobStatus) -> PollOutcome {
    match status.status {
        JobState::Completed if status.is_recent => {
            PollOutcome::Completed(status.stats.unwrap_or_default())
        }
        JobState::Completed => {
            debug!(job = %target, "ignoring completed status from a previous run");
            PollOutcome::Pending
        }
        JobState::Failed => {
            PollOutcome::Failed(JobError::job_failed(status.error_message.as_deref()))
        }
        JobState::Queued | JobState::Running | JobState::Unknown => PollOutcome::Pending,
    }
}

#[allow(clippy::too_many_lines)]
async fn drive<B: JobBackend>(
    inner: Arc<MonitorInner<B>>,
    target: TargetId,
    token: CancellationToken,
) {
    // ── Submit ──
    let submitted = tokio::select! {
        biased;
        () = token.cancelled() => return,
        result = inner.backend.submit(&target) => result,
    };

    match submitted {
        Ok(()) => {
            if !inner.settle_submission(&token, |run| run.phase = JobPhase::Queued) {
                return;
            }
            info!(job = %target, "sync queued");
        }
        Err(err) => {
            warn!(job = %target, error = %err, "sync submission failed");
            let error = JobError::from_api(&err, JobStage::Submit);
            let message = error.message.clone();
            if inner.settle_submission(&token, |run| {
                run.error = Some(error);
                run.finish(JobPhase::Failed);
            }) {
                inner.notifier.notify(Notice::error(message));
            }
            return;
        }
    }

    // ── Queued ──
    tokio::select! {
        biased;
        () = token.cancelled() => return,
        () = tokio::time::sleep(inner.settings.initial_delay) => {}
    }
    if !inner.apply(&token, |run| run.phase = JobPhase::Polling) {
        return;
    }

    // ── Polling ──
    let max_attempts = inner.settings.max_attempts.max(1);
    let mut ticker = tokio::time::interval(inner.settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut attempts = 0u32;

    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => return,
            _ = ticker.tick() => {}
        }

        attempts += 1;
        let polled = tokio::select! {
            biased;
            () = token.cancelled() => return,
            result = inner.backend.status(&target) => result,
        };

        let outcome = match polled {
            Ok(status) => classify(&target, status),
            Err(err) => {
                // A failed poll is not a failed job; try again next tick.
                warn!(job = %target, attempt = attempts, error = %err, "status poll failed");
                PollOutcome::Pending
            }
        };

        match outcome {
            PollOutcome::Completed(stats) => {
                let applied = inner.apply(&token, |run| {
                    run.attempts = attempts;
                    run.result = Some(stats.clone());
                    run.finish(JobPhase::Completed);
                });
                if applied {
                    info!(job = %target, attempts, "sync completed");
                    inner.notifier.notify(Notice::success("Sync completed."));
                    if let Some(hook) = &inner.on_complete {
                        hook(&stats);
                    }
                }
                return;
            }
            PollOutcome::Failed(error) => {
                warn!(job = %target, attempts, reason = %error.message, "sync failed");
                let message = error.message.clone();
                if inner.apply(&token, |run| {
                    run.attempts = attempts;
                    run.error = Some(error);
                    run.finish(JobPhase::Failed);
                }) {
                    inner.notifier.notify(Notice::error(message));
                }
                return;
            }
            PollOutcome::Pending => {
                if !inner.apply(&token, |run| run.attempts = attempts) {
                    return;
                }
            }
        }

        if attempts >= max_attempts {
            warn!(job = %target, attempts, "stopped waiting for sync");
            let error = JobError::timed_out(attempts);
            let message = error.message.clone();
            if inner.apply(&token, |run| {
                run.error = Some(error);
                run.finish(JobPhase::TimedOut);
            }) {
                inner.notifier.notify(Notice::warning(message));
            }
            return;
        }
    }
}
