//! slotwatch CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use slotwatch_client::cli::{Cli, Command, ConfigAction, SubscribersAction};
use slotwatch_client::commands;
use slotwatch_client::config::ClientConfig;
use slotwatch_client::error::{ClientError, ClientResult};
use slotwatch_core::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let mut config = if cli.config.is_some() {
        ClientConfig::load_from(&config_path).map_err(ClientError::Config)?
    } else {
        ClientConfig::load().map_err(ClientError::Config)?
    };

    init_tracing(cli.tracing_config(&config).map_err(ClientError::Config)?)?;

    // After tracing, so skipped values are logged.
    config
        .apply_env_overrides(|name| std::env::var(name).ok())
        .map_err(ClientError::Config)?;

    match cli.effective_command() {
        Command::Run { once } => commands::run::run(&config, once).await,
        Command::Check => commands::check::check(&config).await,
        Command::Slots => commands::slots::slots(&config).await,
        Command::Prune { days } => commands::prune::prune(&config, days).await,
        Command::Subscribers { action } => match action {
            SubscribersAction::List => commands::subscribers::list(&config).await,
            SubscribersAction::Add { chat_id } => commands::subscribers::add(&config, chat_id).await,
            SubscribersAction::Remove { chat_id } => {
                commands::subscribers::remove(&config, chat_id).await
            }
        },
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config, &config_path),
        },
    }
}
