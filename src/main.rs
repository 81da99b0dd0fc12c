use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use std::path::PathBuf;
use std::sync::Arc;

use reportsync::config::{default_log_path, get_config_path, load_config, Config};
use reportsync::sync::http::HttpStatusSource;
use reportsync::sync::{ActionKind, StatusSource, TrackerSettings};
use reportsync::{app, commands, logging};

#[derive(Parser, Debug)]
#[command(name = "reportsync", version, about = "Set up and monitor self-service reports")]
struct Cli {
    /// Path to the configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Server address, overrides the configuration file
    #[arg(long)]
    base_url: Option<String>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Print the current status once
    Status,
    /// Set up reports and wait until done
    Setup,
    /// Delete the reports setup and wait until done
    Teardown,
    /// Refresh report questions and wait until done
    Refresh,
    /// Interactive reports screen (default)
    Screen,
}

impl Command {
    fn action(&self) -> Option<ActionKind> {
        match self {
            Command::Setup => Some(ActionKind::Setup),
            Command::Teardown => Some(ActionKind::Teardown),
            Command::Refresh => Some(ActionKind::RefreshQuestions),
            Command::Status | Command::Screen => None,
        }
    }
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => get_config_path()?,
    };
    let mut config = load_config(&config_path)?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    let command = cli.command.unwrap_or(Command::Screen);

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        logging::parse_level(&config.log_level)
    };
    match command {
        Command::Screen => {
            let log_path = match &config.log_file {
                Some(path) => path.clone(),
                None => default_log_path()?,
            };
            logging::init_file_logger(level, &log_path)?;
        }
        _ => logging::init_terminal_logger(level)?,
    }
    info!("Using server {}", config.base_url);

    let source: Arc<dyn StatusSource> = Arc::new(
        HttpStatusSource::new(&config.base_url, config.request_timeout())
            .context("Failed to create status client")?,
    );

    match command {
        Command::Status => commands::print_status(source.as_ref()).await,
        Command::Screen => app::run_screen(&config, source).await,
        other => {
            let action = other.action().context("command has no action")?;
            commands::run_action(source, TrackerSettings::from(&config), action)
                .await
                .map(|_| ())
        }
    }
}
