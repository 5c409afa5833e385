//! cycle-post - Publish the next item of the content cycle
//!
//! Meant to be invoked on a schedule (cron, systemd timer, CI). Each
//! invocation performs exactly one run.

use clap::Parser;
use libcyclecast::logging::LoggingConfig;
use libcyclecast::platforms::x::XClient;
use libcyclecast::selector::CycleStatus;
use libcyclecast::{
    ClientCredentials, Config, CyclecastError, FileStore, Result, RunReport, Runner,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "cycle-post")]
#[command(version)]
#[command(about = "Publish the next item of the content cycle")]
#[command(long_about = "\
cycle-post - Publish the next item of the content cycle

DESCRIPTION:
    Picks the next unposted item from a shuffled cycle over the content
    pool, refreshes the OAuth2 access token, publishes the item (a single
    post or a reply-chained thread) and records it as posted. Every item
    is posted once before any item repeats.

USAGE:
    # One scheduled run
    cycle-post

    # Show what would be posted next, without posting
    cycle-post --dry-run

    # Progress through the current cycle
    cycle-post --status

ENVIRONMENT:
    CLIENT_ID, CLIENT_SECRET   OAuth2 client (required to post)
    CYCLECAST_CONFIG           Config file path
    CYCLECAST_LOG_FORMAT       text, json or pretty
    CYCLECAST_LOG_LEVEL        Log level (default: info)

CONFIGURATION:
    Configuration file: ~/.config/cyclecast/config.toml

    [content]
    pool = \"content/tweets.json\"

    [storage]
    state = \"content/state.json\"
    credentials = \"content/tokens.json\"

    [posting]
    thread_policy = \"publish\"   # or \"skip\"

EXIT CODES:
    0 - Success
    1 - Configuration, storage or posting error
    2 - Authentication error
    3 - Invalid input
")]
struct Cli {
    /// Config file (default: $CYCLECAST_CONFIG or ~/.config/cyclecast/config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Select and print the next item without posting
    #[arg(long, conflicts_with = "status")]
    dry_run: bool,

    /// Print cycle progress and exit
    #[arg(long)]
    status: bool,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.verbose).init();

    if let Err(e) = run(cli).await {
        error!("Run failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = CyclecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(CyclecastError::InvalidInput(format!(
                "Unknown output format '{}'. Expected text or json",
                other
            ))),
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let format: OutputFormat = cli.format.parse()?;
    let config = Config::load(cli.config.as_deref())?;

    let store = Arc::new(FileStore::new());
    let api = Arc::new(XClient::from_config(&config.api));
    let mut runner = Runner::from_config(&config, api, store);

    if cli.status {
        let status = runner.status()?;
        print_status(&status, format)?;
        return Ok(());
    }

    if cli.dry_run {
        let report = runner.dry_run()?;
        print_report(&report, format)?;
        return Ok(());
    }

    // Secrets are checked before anything is selected or sent
    let client = ClientCredentials::from_env()?;

    let report = runner.run_once(&client).await?;
    print_report(&report, format)
}

fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", to_json(report)?),
        OutputFormat::Text => {
            for index in &report.skipped {
                println!("skipped thread #{}", index);
            }

            let texts = report.item.texts();
            if report.post_ids.is_empty() {
                println!("next: #{} ({})", report.index, report.kind);
                for text in texts {
                    println!("  {}", text);
                }
            } else {
                println!("posted #{} ({})", report.index, report.kind);
                for id in &report.post_ids {
                    println!("  {}", id);
                }
            }
        }
    }
    Ok(())
}

fn print_status(status: &CycleStatus, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", to_json(status)?),
        OutputFormat::Text => println!(
            "{}/{} posted this cycle, {} remaining",
            status.posted, status.pool_size, status.remaining
        ),
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| {
        CyclecastError::InvalidInput(format!("Failed to serialize output: {}", e))
    })
}
