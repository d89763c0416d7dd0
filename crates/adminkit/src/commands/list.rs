//! `adminkit list <resource>`.

use std::sync::Arc;

use tokio::sync::mpsc;

use adminkit_api::ApiClient;
use adminkit_core::{FetchRequest, ListController, ListQueryState, NoticeLevel};

use crate::cli::{GlobalOpts, ListArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    args: ListArgs,
    client: ApiClient,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (tx, mut notices) = mpsc::unbounded_channel();
    let state = ListQueryState {
        current_page: args.page,
        per_page: args.per_page,
        search_term: args.search,
        filters: args.filters.into_iter().collect(),
        deps: Vec::new(),
    };
    let controller = ListController::new(client, args.resource.as_str())
        .with_notifier(Arc::new(tx))
        .with_state(state);

    let entry = controller.fetch(FetchRequest::default()).await;

    // The controller degrades failures to an empty page; the CLI wants
    // a non-zero exit instead.
    while let Ok(notice) = notices.try_recv() {
        if notice.level == NoticeLevel::Error {
            return Err(CliError::ListFailed {
                resource: args.resource,
                detail: notice.message,
            });
        }
    }

    let rendered = output::render_records(global.output, &entry.items)?;
    output::print_output(&rendered, global.quiet);

    if matches!(global.output, OutputFormat::Table) && !global.quiet {
        if entry.items.is_empty() {
            eprintln!("No {} found.", args.resource);
        }
        eprintln!("{}", output::page_summary(&controller.view()));
    }
    Ok(())
}
