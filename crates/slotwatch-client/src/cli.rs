//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;

use slotwatch_core::{TracingConfig, TracingOutputFormat};

use crate::config::ClientConfig;

/// slotwatch - get told when a booking slot opens up
#[derive(Debug, Parser)]
#[command(name = "slotwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "SLOTWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log format: pretty, compact or json
    #[arg(long, env = "SLOTWATCH_LOG_FORMAT")]
    pub log_format: Option<TracingOutputFormat>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Returns the command to run; the poller when none is given.
    pub fn effective_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run { once: false })
    }

    /// Tracing setup for this invocation.
    ///
    /// The poller logs JSON at info level; other commands log warnings only.
    /// `--log-format` wins over `logging.format` in the file.
    pub fn tracing_config(&self, config: &ClientConfig) -> Result<TracingConfig, String> {
        let debug = self.debug || config.debug;
        let mut tracing = match self.effective_command() {
            Command::Run { .. } if debug => TracingConfig::daemon().with_level(Level::DEBUG),
            Command::Run { .. } => TracingConfig::daemon(),
            _ => TracingConfig::cli(debug),
        };

        let format = match (self.log_format, config.logging.format.as_deref()) {
            (Some(format), _) => Some(format),
            (None, Some(raw)) => Some(raw.parse::<TracingOutputFormat>()?),
            (None, None) => None,
        };
        if let Some(format) = format {
            tracing = tracing.with_format(format);
        }
        Ok(tracing)
    }
}

/// Available commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Poll for new slots and notify subscribers (default)
    Run {
        /// Run a single tick and exit
        #[arg(long)]
        once: bool,
    },

    /// Log in and list bookable staff per configured service
    Check,

    /// Print currently bookable slots without notifying anyone
    Slots,

    /// Drop seen-slot records older than the retention window
    Prune {
        /// Retention in days (defaults to `polling.retention_days`)
        #[arg(long)]
        days: Option<u64>,
    },

    /// Subscriber administration
    Subscribers {
        #[command(subcommand)]
        action: SubscribersAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Subscriber actions.
#[derive(Debug, Clone, Subcommand)]
pub enum SubscribersAction {
    /// List subscribers
    List,
    /// Add a Telegram chat id
    Add {
        #[arg(allow_negative_numbers = true)]
        chat_id: i64,
    },
    /// Remove a Telegram chat id
    Remove {
        #[arg(allow_negative_numbers = true)]
        chat_id: i64,
    },
}

/// Configuration actions.
#[derive(Debug, Clone, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration with secrets masked
    Dump,
    /// Check that the configuration is usable
    Validate,
    /// Show the configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_runs_the_poller() {
        let cli = Cli::try_parse_from(["slotwatch"]).unwrap();
        assert!(matches!(cli.effective_command(), Command::Run { once: false }));
    }

    #[test]
    fn negative_chat_ids_are_accepted() {
        let cli = Cli::try_parse_from(["slotwatch", "subscribers", "add", "-100123"]).unwrap();
        assert!(matches!(
            cli.effective_command(),
            Command::Subscribers {
                action: SubscribersAction::Add { chat_id: -100123 }
            }
        ));
    }

    #[test]
    fn poller_logs_json_by_default() {
        let cli = Cli::try_parse_from(["slotwatch", "run"]).unwrap();
        let tracing = cli.tracing_config(&ClientConfig::default()).unwrap();
        assert_eq!(tracing.output_format, TracingOutputFormat::Json);
        assert_eq!(tracing.default_level, Level::INFO);
    }

    #[test]
    fn one_shot_commands_are_quiet() {
        let cli = Cli::try_parse_from(["slotwatch", "slots"]).unwrap();
        let tracing = cli.tracing_config(&ClientConfig::default()).unwrap();
        assert_eq!(tracing.default_level, Level::WARN);
    }

    #[test]
    fn log_format_flag_beats_config() {
        let mut config = ClientConfig::default();
        config.logging.format = Some("pretty".into());

        let cli = Cli::try_parse_from(["slotwatch", "--log-format", "compact", "run"]).unwrap();
        let tracing = cli.tracing_config(&config).unwrap();
        assert_eq!(tracing.output_format, TracingOutputFormat::Compact);

        let cli = Cli::try_parse_from(["slotwatch", "run"]).unwrap();
        let tracing = cli.tracing_config(&config).unwrap();
        assert_eq!(tracing.output_format, TracingOutputFormat::Pretty);
    }

    #[test]
    fn bad_log_format_in_config_errors() {
        let mut config = ClientConfig::default();
        config.logging.format = Some("xml".into());
        let cli = Cli::try_parse_from(["slotwatch", "check"]).unwrap();
        assert!(cli.tracing_config(&config).is_err());
    }
}
