//! Clap derive structures for the `adminkit` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use adminkit_core::FilterValue;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// adminkit -- browse admin resources and run background syncs
#[derive(Debug, Parser)]
#[command(
    name = "adminkit",
    version,
    about = "Browse paginated admin resources and run background syncs",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// API base URL (overrides api.base_url in the config file)
    #[arg(long, short = 'u', env = "ADMINKIT_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Config file to load instead of the platform default
    #[arg(long, env = "ADMINKIT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in seconds (overrides api.timeout_secs)
    #[arg(long, env = "ADMINKIT_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one record id per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one page of a resource
    #[command(alias = "ls")]
    List(ListArgs),

    /// Start a background sync for one record and wait for it to finish
    Sync(SyncArgs),

    /// Inspect configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Resource path, e.g. "users" or "email-accounts"
    pub resource: String,

    /// 1-based page number
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Rows per page
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    pub per_page: u32,

    /// Free-text search term
    #[arg(long, short = 's', default_value = "")]
    pub search: String,

    /// Extra filter as KEY=VALUE (repeatable). VALUE "null" omits the filter.
    #[arg(long = "filter", short = 'f', value_parser = parse_filter)]
    pub filters: Vec<(String, FilterValue)>,
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Resource path owning the job, e.g. "email-accounts"
    pub resource: String,

    /// Record id to sync
    pub id: String,

    /// Override jobs.max_attempts
    #[arg(long)]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file path
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

// ── Value parsers ────────────────────────────────────────────────────

/// Parse `KEY=VALUE`, inferring null, booleans and numbers.
fn parse_filter(raw: &str) -> Result<(String, FilterValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("filter key cannot be empty".into());
    }

    let value = match value {
        "null" => FilterValue::Null,
        "true" => FilterValue::Bool(true),
        "false" => FilterValue::Bool(false),
        v => infer_number(v).unwrap_or_else(|| FilterValue::Text(v.to_owned())),
    };
    Ok((key.to_owned(), value))
}

/// A number only if it renders back to exactly what was typed, so
/// `01234`, `1e3` and `1.50` stay text. Non-finite floats are never numbers.
fn infer_number(raw: &str) -> Option<FilterValue> {
    let value = match raw.parse::<i64>() {
        Ok(i) => FilterValue::Int(i),
        Err(_) => match raw.parse::<f64>() {
            Ok(f) if f.is_finite() => FilterValue::Float(f),
            _ => return None,
        },
    };
    (value.as_query_value().as_deref() == Some(raw)).then_some(value)
}
