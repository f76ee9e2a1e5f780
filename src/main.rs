//! upwork-oauth -- command-line front end for the Upwork OAuth client.
//!
//! Wires together:
//!   - Settings loading (logging, endpoints, env overrides)
//!   - The TOML config store holding credentials and tokens
//!   - The token manager and the API client

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use upwork_oauth::api::DEFAULT_SEARCH_QUERY;
use upwork_oauth::{FileConfigStore, Settings, TokenManager, UpworkClient};

// ---------------------------------------------------------------------------
// CLI argument parsing (minimal, no clap dependency)
// ---------------------------------------------------------------------------

enum Command {
    AuthUrl,
    Login,
    Refresh,
    Status,
    Search(String),
    Profile,
    Logout,
}

struct CliArgs {
    config_path: Option<PathBuf>,
    command: Command,
}

fn parse_args() -> CliArgs {
    let mut args = std::env::args().skip(1);
    let mut config_path = None;
    let mut command = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                if let Some(path) = args.next() {
                    config_path = Some(PathBuf::from(path));
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("upwork-oauth {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "auth-url" => command = Some(Command::AuthUrl),
            "login" => command = Some(Command::Login),
            "refresh" => command = Some(Command::Refresh),
            "status" => command = Some(Command::Status),
            "profile" => command = Some(Command::Profile),
            "logout" => command = Some(Command::Logout),
            "search" => {
                let rest: Vec<String> = args.by_ref().collect();
                let query = if rest.is_empty() {
                    DEFAULT_SEARCH_QUERY.to_string()
                } else {
                    rest.join(" ")
                };
                command = Some(Command::Search(query));
            }
            other => {
                eprintln!("Unknown argument: {other}");
                eprintln!("Run with --help for usage information.");
                std::process::exit(1);
            }
        }
    }

    let Some(command) = command else {
        print_usage();
        std::process::exit(1);
    };

    CliArgs {
        config_path,
        command,
    }
}

fn print_usage() {
    println!(
        "\
upwork-oauth {version} -- Upwork OAuth client

USAGE:
    upwork-oauth [OPTIONS] <COMMAND>

COMMANDS:
    auth-url           Print the URL that grants an authorization code
    login              Exchange the configured auth_code for tokens
    refresh            Refresh the access token now
    status             Show token status as JSON
    search [QUERY]     Search jobs [default query: {query}]
    profile            Fetch the authenticated client profile
    logout             Remove stored tokens

OPTIONS:
    -c, --config <PATH>    Path to configuration file [default: upwork.toml]
    -h, --help             Print this help message
    -V, --version          Print version information

ENVIRONMENT:
    RUST_LOG               Override log level (e.g. RUST_LOG=debug)
    UPWORK_CONFIG          Alternative to --config flag
    UPWORK_LOG_LEVEL       Log level when RUST_LOG is unset
    UPWORK_LOG_JSON        Emit JSON logs (true/false)
    UPWORK_AUTH_URL        Authorization endpoint override
    UPWORK_TOKEN_URL       Token endpoint override
    UPWORK_API_BASE_URL    API base URL override
",
        version = env!("CARGO_PKG_VERSION"),
        query = DEFAULT_SEARCH_QUERY,
    );
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = parse_args();

    // --config wins, then UPWORK_CONFIG, then the default file name.
    let config_path = cli
        .config_path
        .or_else(|| std::env::var("UPWORK_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("upwork.toml"));

    let settings = Settings::load(&config_path)
        .with_context(|| format!("Failed to load settings from {}", config_path.display()))?;

    init_tracing(&settings);

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "Starting upwork-oauth"
    );
    for (setting, env_var) in settings.env_overrides.all() {
        tracing::info!(%setting, %env_var, "Setting overridden by environment");
    }

    let store = Arc::new(FileConfigStore::new(&config_path));
    let manager = Arc::new(
        TokenManager::from_store(store)
            .context("Failed to load Upwork credentials")?
            .with_endpoints(settings.endpoints.clone()),
    );

    match cli.command {
        Command::AuthUrl => println!("{}", manager.build_authorization_url()),
        Command::Login => {
            manager.exchange_code_for_tokens().await?;
            println!("Login successful. Access token obtained.");
        }
        Command::Refresh => {
            manager.refresh_access_token().await?;
            println!("Access token refreshed.");
        }
        Command::Status => {
            let status = manager.status().await;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Search(query) => {
            let client = UpworkClient::from_manager(manager);
            let jobs = client.search_jobs(&query).await?;
            println!("{}", serde_json::to_string_pretty(&jobs)?);
        }
        Command::Profile => {
            let client = UpworkClient::from_manager(manager);
            let profile = client.get_profile().await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Command::Logout => {
            manager.logout().await?;
            println!("Tokens removed.");
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

fn init_tracing(settings: &Settings) {
    // RUST_LOG env var takes precedence over the config file
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &settings.logging.level;
        // Set this crate to the configured level, dependencies to warn
        EnvFilter::new(format!("upwork_oauth={level},warn"))
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if settings.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
