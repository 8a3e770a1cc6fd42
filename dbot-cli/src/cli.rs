//! CLI parser and config loading.

use anyhow::Result;
use clap::{Parser, Subcommand};
use dbot_telegram::BotConfig;

#[derive(Parser, Debug)]
#[command(name = "dbot")]
#[command(about = "Conversational Telegram bot", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot (config from env; flags override it).
    Run {
        /// Overrides BOT_TOKEN.
        #[arg(short, long)]
        token: Option<String>,
        /// Drain updates queued while offline without handling them.
        #[arg(long)]
        ignore_current_batch: bool,
        /// Long-poll wait in seconds; overrides POLL_TIMEOUT.
        #[arg(long)]
        timeout: Option<u64>,
    },
}

/// Loads [`BotConfig`] from the environment and applies CLI overrides.
pub fn load_config(
    token: Option<String>,
    ignore_current_batch: bool,
    timeout: Option<u64>,
) -> Result<BotConfig> {
    let mut config = BotConfig::load(token)?;
    if ignore_current_batch {
        config.ignore_current_batch = true;
    }
    if let Some(timeout) = timeout {
        config.poll_timeout = timeout;
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "dbot",
            "run",
            "--token",
            "abc",
            "--ignore-current-batch",
            "--timeout",
            "0",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Commands::Run {
                token: Some("abc".to_string()),
                ignore_current_batch: true,
                timeout: Some(0),
            }
        );
    }

    #[test]
    fn test_parse_run_defaults() {
        let cli = Cli::try_parse_from(["dbot", "run"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Run {
                token: None,
                ignore_current_batch: false,
                timeout: None,
            }
        );
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(Cli::try_parse_from(["dbot", "load"]).is_err());
    }
}
