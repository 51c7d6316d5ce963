mod commands;
mod setup;

use anyhow::Context;
use clap::Parser;
use keel_cloud::{Console, TerminalConsole};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keel")]
#[command(about = "Reconcile cloud groups, users and buckets against a YAML configuration")]
#[command(after_help = "Commands:\n  load       load deployed state\n  create     create configured resources\n  destroy    destroy configured resources\n  provision  update configured resources\n  audit      report drift between configuration and backend\n  info       show allocated resources\n  config     show the configuration\n  help       show resource help\n  auth       check provider authentication\n  version    print the version")]
struct Cli {
    /// Configuration file (default: discovered from the current directory)
    #[arg(short, long, env = "KEEL_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Backend to use: memory or aws
    #[arg(short, long, env = "KEEL_PROVIDER")]
    provider: Option<String>,

    /// Name of the audit accumulator
    #[arg(long, default_value = "keel")]
    audit_id: String,

    /// Show debug logs
    #[arg(short, long)]
    verbose: bool,

    /// Command to run
    command: String,

    /// Single resource to act on, as <kind>/<name>
    target: Option<String>,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // No configuration needed
    if cli.command == "version" {
        println!("keel {}", env!("CARGO_PKG_VERSION"));
        return Ok(ExitCode::SUCCESS);
    }

    let config_path = match cli.config {
        Some(path) => path,
        None => keel_config::find_config_file()?,
    };
    let document = keel_config::load_document(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let provider = cli
        .provider
        .as_deref()
        .or(document.provider.name.as_deref())
        .unwrap_or(setup::DEFAULT_PROVIDER);
    let providers = setup::connect(provider, &document).await?;

    if cli.command == "auth" {
        let ok = commands::auth::handle(&providers).await?;
        return Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    let console: Arc<dyn Console> = Arc::new(TerminalConsole::new());

    if cli.command == "config" && cli.target.is_none() {
        document.print(console.as_ref());
        return Ok(ExitCode::SUCCESS);
    }

    let mut tree = setup::build_tree(&providers, &document, Arc::clone(&console)).await?;
    let response = commands::route::handle(
        &mut tree,
        console,
        &cli.command,
        cli.target.as_deref(),
        &cli.audit_id,
    )
    .await?;

    Ok(if response.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
