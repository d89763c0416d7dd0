mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use adminkit_core::ResultCache;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "adminkit", &mut std::io::stdout());
            Ok(())
        }

        // Config commands don't need an API connection
        Command::Config(args) => commands::config_cmd::handle(&args, &cli.global),

        Command::List(args) => {
            let (config, client) = commands::util::connect(&cli.global)?;
            ResultCache::init_shared(config.cache_policy());
            commands::list::handle(args, client, &cli.global).await
        }

        Command::Sync(args) => {
            let (config, client) = commands::util::connect(&cli.global)?;
            let mut settings = config.poll_settings()?;
            if let Some(max) = args.max_attempts {
                settings.max_attempts = max.max(1);
            }
            commands::sync::handle(args, client, settings, &cli.global).await
        }
    }
}
