//! Clap derive structures for the `eventdekho` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// eventdekho -- browse and manage events from the command line
#[derive(Debug, Parser)]
#[command(
    name = "eventdekho",
    version,
    about = "Browse, search and manage EventDekho events from the command line",
    long_about = "A command-line client for the EventDekho REST backend.\n\n\
        Works against any resource endpoint (events, users, registrations)\n\
        and can follow live updates over server-sent events.",
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
    /// Backend API base URL (overrides config)
    #[arg(long, short = 'u', env = "EVENTDEKHO_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "EVENTDEKHO_OUTPUT",
        default_value = "json",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (default: none)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List records, optionally one page at a time
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show one record
    Get(RecordArgs),

    /// Create a record from a JSON document
    Create(CreateArgs),

    /// Replace a record with a JSON document
    Update(UpdateArgs),

    /// Delete a record
    #[command(alias = "rm")]
    Delete(RecordArgs),

    /// Search an endpoint
    Search(SearchArgs),

    /// Follow live updates from an endpoint's stream
    Watch(WatchArgs),

    /// Inspect CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Resource endpoint, e.g. `events`
    pub endpoint: String,

    /// Fetch this page (1-based)
    #[arg(long)]
    pub page: Option<u32>,

    /// Items per page (defaults to the configured page size)
    #[arg(long, short = 'l')]
    pub limit: Option<u32>,

    /// Extra query parameter, repeatable
    #[arg(long = "param", short = 'P', value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    pub endpoint: String,
    pub id: String,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    pub endpoint: String,

    /// JSON body
    #[arg(long, short = 'd')]
    pub data: String,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub endpoint: String,
    pub id: String,

    /// JSON body
    #[arg(long, short = 'd')]
    pub data: String,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    pub endpoint: String,
    pub query: String,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    pub endpoint: String,

    /// Exit after this many messages
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    pub shell: Shell,
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_owned(), value.to_owned()))
}
