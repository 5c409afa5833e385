//! cycle-setup - One-time OAuth2 authorization for cycle-post
//!
//! Runs the PKCE authorization-code flow interactively and writes the
//! first access/refresh token pair to the credentials file. After that,
//! cycle-post rotates the pair on every run.

use anyhow::{Context, Result};
use clap::Parser;
use libcyclecast::config::{CLIENT_ID_ENV, CLIENT_SECRET_ENV};
use libcyclecast::logging::LoggingConfig;
use libcyclecast::oauth::AuthorizationRequest;
use libcyclecast::platforms::x::XClient;
use libcyclecast::{ClientCredentials, Config, CyclecastError, FileStore, Publisher};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "cycle-setup")]
#[command(version)]
#[command(about = "Authorize cycle-post against the X API (run once)", long_about = None)]
struct Cli {
    /// Config file (default: $CYCLECAST_CONFIG or ~/.config/cyclecast/config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Replace existing credentials without asking
    #[arg(long)]
    force: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.verbose).init();

    if let Err(e) = run_setup(&cli).await {
        error!("Setup failed: {:#}", e);
        eprintln!("Error: {:#}", e);

        let code = e
            .downcast_ref::<CyclecastError>()
            .map(CyclecastError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run_setup(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    let store = Arc::new(FileStore::new());
    let api = Arc::new(XClient::from_config(&config.api));
    let publisher = Publisher::from_config(&config, api, store);

    let stdin = io::stdin();
    let mut input = stdin.lock();

    if publisher.has_credentials()? && !cli.force {
        let answer = prompt_line(
            &mut input,
            &format!(
                "Credentials already exist at {}. Replace them? [y/N]: ",
                config.credentials_path().display()
            ),
        )?;
        if !answer.eq_ignore_ascii_case("y") && !answer.eq_ignore_ascii_case("yes") {
            println!("Keeping existing credentials.");
            return Ok(());
        }
    }

    let client = client_credentials(&mut input)?;

    let request =
        AuthorizationRequest::new(&config.api, &client.client_id, &mut rand::thread_rng())?;

    println!();
    println!("Step 1: open this URL in a browser and approve the app:");
    println!();
    println!("{}", request.url);
    println!();
    println!("Step 2: after approving, the browser is sent to");
    println!("{}?state=...&code=...", request.redirect_uri);
    println!("The page may fail to load; copy the full URL from the address bar.");
    println!();

    let callback = prompt_line(&mut input, "Paste the callback URL: ")?;
    let grant = request.grant_from_callback(&callback)?;

    info!("Exchanging authorization code for tokens");
    publisher.authorize(&client, &grant).await?;

    println!();
    println!(
        "Credentials saved to {}",
        config.credentials_path().display()
    );
    println!("cycle-post is ready to run.");

    Ok(())
}

/// Client identity from the environment, prompting for whatever is missing
fn client_credentials(input: &mut impl BufRead) -> Result<ClientCredentials> {
    if let Ok(client) = ClientCredentials::from_env() {
        info!("Using client credentials from the environment");
        return Ok(client);
    }

    let client_id = match std::env::var(CLIENT_ID_ENV) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => prompt_line(input, "Client ID: ")?,
    };

    let client_secret = match std::env::var(CLIENT_SECRET_ENV) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => rpassword::prompt_password("Client secret: ")
            .context("Failed to read client secret")?
            .trim()
            .to_string(),
    };

    if client_id.is_empty() || client_secret.is_empty() {
        return Err(CyclecastError::InvalidInput(
            "Client ID and client secret are required".to_string(),
        )
        .into());
    }

    Ok(ClientCredentials::new(client_id, client_secret))
}

fn prompt_line(input: &mut impl BufRead, prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut line = String::new();
    let read = input.read_line(&mut line).context("Failed to read input")?;
    if read == 0 {
        return Err(CyclecastError::InvalidInput("Unexpected end of input".to_string()).into());
    }

    Ok(line.trim().to_string())
}
