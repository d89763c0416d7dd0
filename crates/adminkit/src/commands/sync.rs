//! `adminkit sync <resource> <id>`: start a job and follow it to the end.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use adminkit_api::ApiClient;
use adminkit_core::{HttpJobBackend, JobMonitor, JobPhase, JobRun, NoticeLevel, PollSettings};

use crate::cli::{GlobalOpts, SyncArgs};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

pub async fn handle(
    args: SyncArgs,
    client: ApiClient,
    settings: PollSettings,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (tx, mut notices) = mpsc::unbounded_channel();
    let monitor = JobMonitor::builder(
        HttpJobBackend::new(client, args.resource.as_str()),
        args.id.as_str(),
    )
    .settings(settings)
    .notifier(Arc::new(tx))
    .build();

    monitor.confirm();
    let prompt = format!("Start a sync for {} {}?", args.resource, args.id);
    if !util::confirm(&prompt, "sync", global.yes)? {
        monitor.cancel_confirm();
        eprintln!("Cancelled.");
        return Ok(());
    }
    monitor.start();

    let spinner = (!global.quiet).then(create_spinner);
    let mut rx = monitor.subscribe();
    let run = loop {
        let run = rx.borrow_and_update().clone();
        if let Some(pb) = &spinner {
            pb.set_message(describe(&run, settings.max_attempts));
        }
        if run.phase.is_terminal() {
            break run;
        }
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break monitor.snapshot();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                monitor.close();
                if let Some(pb) = &spinner {
                    pb.finish_and_clear();
                }
                return Err(CliError::Interrupted);
            }
        }
    };
    if let Some(pb) = &spinner {
        pb.finish_and_clear();
    }

    let color = output::should_color(global.color);
    while let Ok(notice) = notices.try_recv() {
        // Failures surface as the returned error instead.
        if matches!(notice.level, NoticeLevel::Success | NoticeLevel::Info) && !global.quiet {
            eprintln!("{}", output::format_notice(&notice, color));
        }
    }

    match (run.phase, run.error, run.result) {
        (JobPhase::Completed, _, stats) => {
            let rendered = output::render_stats(global.output, &stats.unwrap_or_default())?;
            output::print_output(&rendered, global.quiet);
            Ok(())
        }
        (_, Some(err), _) => Err(CliError::from_job(err, &args.resource, &args.id)),
        (phase, None, _) => Err(CliError::JobFailed {
            message: format!("sync ended in phase {phase}"),
        }),
    }
}

fn describe(run: &JobRun, max_attempts: u32) -> String {
    match run.phase {
        JobPhase::Submitting => format!("Submitting sync for {}...", run.target),
        JobPhase::Queued => "Queued, waiting for a worker...".to_owned(),
        JobPhase::Polling => format!("Syncing (check {}/{max_attempts})...", run.attempts),
        phase => phase.to_string(),
    }
}

fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"])
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}
